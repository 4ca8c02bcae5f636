//! Networkless verification of Clerk session tokens (RS256 JWTs signed with the
//! instance key). The plan comes from the `pla` billing claim.

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use super::{AuthError, Identity, IdentityProvider, Plan};

const PREMIUM_PLAN_SLUG: &str = "premium";

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    azp: Option<String>,
    /// e.g. `u:premium` (user plan) or `o:premium` (organization plan).
    #[serde(default)]
    pla: Option<String>,
}

pub struct ClerkTokenVerifier {
    key: DecodingKey,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl ClerkTokenVerifier {
    pub fn new(public_key_pem: &str, authorized_parties: Vec<String>) -> anyhow::Result<Self> {
        let key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.leeway = 5;

        Ok(Self {
            key,
            validation,
            authorized_parties,
        })
    }
}

#[async_trait]
impl IdentityProvider for ClerkTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let claims = decode::<SessionClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?
            .claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .is_some_and(|azp| self.authorized_parties.contains(azp));
            if !allowed {
                return Err(AuthError::UnauthorizedParty(claims.azp));
            }
        }

        if claims.sub.is_empty() {
            return Err(AuthError::InvalidToken("empty subject".to_string()));
        }

        Ok(Identity {
            user_id: claims.sub,
            plan: plan_from_claim(claims.pla.as_deref()),
        })
    }
}

fn plan_from_claim(claim: Option<&str>) -> Plan {
    let slug = claim
        .map(|raw| raw.split_once(':').map(|(_, slug)| slug).unwrap_or(raw))
        .unwrap_or_default();
    if slug.eq_ignore_ascii_case(PREMIUM_PLAN_SLUG) {
        Plan::Premium
    } else {
        Plan::Free
    }
}
