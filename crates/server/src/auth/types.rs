use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // admin id
    pub email: String,
    /// Primary role slug at issue time; informational only.
    pub role: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub sid: String, // session id
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn admin_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sid).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub admin_id: Uuid,
    pub session_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
    pub session_id: Uuid,
}

/// Who is calling, resolved once per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    Admin(AdminIdentity),
}

impl Identity {
    /// Claims with unparsable ids resolve to `Anonymous`.
    pub fn from_claims(claims: &Claims) -> Self {
        match (claims.admin_id(), claims.session_id()) {
            (Some(id), Some(session_id)) => Self::Admin(AdminIdentity {
                id,
                email: claims.email.clone(),
                roles: claims.roles.clone(),
                session_id,
            }),
            _ => Self::Anonymous,
        }
    }

    pub fn admin(&self) -> Option<&AdminIdentity> {
        match self {
            Self::Admin(admin) => Some(admin),
            Self::Anonymous => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Claims, Identity};

    fn claims(sub: String, sid: String) -> Claims {
        Claims {
            sub,
            email: "ops@example.com".to_string(),
            role: "super_admin".to_string(),
            roles: vec!["super_admin".to_string()],
            sid,
            iat: 0,
            exp: 60,
        }
    }

    #[test]
    fn well_formed_claims_become_admin_identity() {
        let id = Uuid::new_v4();
        let sid = Uuid::new_v4();
        let identity = Identity::from_claims(&claims(id.to_string(), sid.to_string()));

        let admin = identity.admin().expect("identity should be admin");
        assert_eq!(admin.id, id);
        assert_eq!(admin.session_id, sid);
        assert_eq!(admin.roles, vec!["super_admin"]);
    }

    #[test]
    fn malformed_ids_fall_back_to_anonymous() {
        let identity = Identity::from_claims(&claims("nope".into(), Uuid::new_v4().to_string()));

        assert_eq!(identity, Identity::Anonymous);
    }
}
