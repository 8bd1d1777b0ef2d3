use serde::{Deserialize, Serialize};

/// What a token is good for. Wire key is `type`; access tokens omit it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    #[default]
    Access,
    PasswordReset,
}

impl TokenPurpose {
    pub fn is_access(&self) -> bool {
        matches!(self, TokenPurpose::Access)
    }
}

/// JWT payload used for authentication and password recovery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    pub iss: String, // issuer
    pub aud: String, // audience
    #[serde(rename = "type", default, skip_serializing_if = "TokenPurpose::is_access")]
    pub purpose: TokenPurpose,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_claims_omit_type_on_the_wire() {
        let claims = Claims {
            sub: "a@x.com".into(),
            iat: 0,
            exp: 60,
            iss: "iss".into(),
            aud: "aud".into(),
            purpose: TokenPurpose::Access,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(!json.contains("\"type\""));
    }

    #[test]
    fn reset_claims_carry_type_password_reset() {
        let claims = Claims {
            sub: "a@x.com".into(),
            iat: 0,
            exp: 60,
            iss: "iss".into(),
            aud: "aud".into(),
            purpose: TokenPurpose::PasswordReset,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("\"type\":\"password_reset\""));
    }

    #[test]
    fn missing_type_deserializes_as_access() {
        let json = r#"{"sub":"a@x.com","iat":0,"exp":60,"iss":"iss","aud":"aud"}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.purpose, TokenPurpose::Access);
    }
}
