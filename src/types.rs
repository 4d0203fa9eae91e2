use std::fmt::Display;

use serde::{Deserialize, Serialize};

// Defines a new type that wraps a String for use as an ID.
macro_rules! idtype {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[allow(dead_code)]
            pub fn from(s: String) -> Self {
                Self(s)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

idtype!(MarkId);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Size<T> {
    pub width: T,
    pub height: T,
}

/// Discrete fill classification of a single mark.
///
/// The numeric codes returned by [`FillState::code`] are consumed
/// positionally by downstream tooling and must not change.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillState {
    Ambiguous,
    Void,
    Filled,
    Overfilled,
}

impl FillState {
    pub fn code(&self) -> i8 {
        match self {
            FillState::Ambiguous => -1,
            FillState::Void => 0,
            FillState::Filled => 1,
            FillState::Overfilled => 2,
        }
    }
}

impl Display for FillState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FillState::Ambiguous => write!(f, "ambiguous"),
            FillState::Void => write!(f, "void"),
            FillState::Filled => write!(f, "filled"),
            FillState::Overfilled => write!(f, "overfilled"),
        }
    }
}
