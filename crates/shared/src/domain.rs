use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

macro_rules! name_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

name_newtype!(ResourceKey);
name_newtype!(AxisName);

impl ResourceKey {
    pub const NEWS: &'static str = "news";
    pub const RESEARCH: &'static str = "research";
    pub const PUBLICATIONS: &'static str = "publications";
    pub const EVENTS: &'static str = "events";
    pub const STUDENTS_CURRENT: &'static str = "students-current";
    pub const STUDENTS_GRADUATED: &'static str = "students-graduated";
    pub const PROFILE: &'static str = "profile";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    #[default]
    Empty,
    Loading,
    Ready,
    Failed,
}
