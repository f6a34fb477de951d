use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Parsing ignores ASCII case and surrounding whitespace.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase();
                match normalized.as_str() {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(RoleKind {
    Patient => "patient",
    Doctor => "doctor",
    Staff => "staff",
    Admin => "admin",
});

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_kind_round_trip() {
        for (variant, s) in [
            (RoleKind::Patient, "patient"),
            (RoleKind::Doctor, "doctor"),
            (RoleKind::Staff, "staff"),
            (RoleKind::Admin, "admin"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(RoleKind::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn role_kind_parse_ignores_case() {
        assert_eq!(RoleKind::from_str("Doctor").unwrap(), RoleKind::Doctor);
        assert_eq!(RoleKind::from_str(" ADMIN ").unwrap(), RoleKind::Admin);
    }

    #[test]
    fn invalid_role_returns_error() {
        let err = RoleKind::from_str("surgeon").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { ref value, .. } if value == "surgeon"));
        assert!(RoleKind::from_str("").is_err());
    }

    #[test]
    fn role_kind_serializes_lowercase() {
        let json = serde_json::to_string(&RoleKind::Staff).unwrap();
        assert_eq!(json, "\"staff\"");
    }
}
