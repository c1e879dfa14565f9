//! Stage catalog: the fixed, ordered stages of each registration wizard.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which registration wizard a user is going through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Driver,
    Restaurant,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Driver => "driver",
            Self::Restaurant => "restaurant",
        }
    }
}

impl std::fmt::Display for UserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "driver" => Ok(Self::Driver),
            "restaurant" => Ok(Self::Restaurant),
            other => Err(ConfigError::UnknownUserType(other.to_string())),
        }
    }
}

/// One step of a registration wizard. Ids are contiguous from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageDefinition {
    pub id: u32,
    pub title: &'static str,
    pub description: &'static str,
}

static DRIVER_STAGES: &[StageDefinition] = &[
    StageDefinition {
        id: 1,
        title: "Personal Information",
        description: "Your name, contact details and address",
    },
    StageDefinition {
        id: 2,
        title: "Vehicle Information",
        description: "Vehicle type, make, model and registration",
    },
    StageDefinition {
        id: 3,
        title: "Document Upload",
        description: "Driver's license, insurance and vehicle registration",
    },
    StageDefinition {
        id: 4,
        title: "Background Check",
        description: "Consent and payment for the background check",
    },
    StageDefinition {
        id: 5,
        title: "Review & Submit",
        description: "Confirm your details and submit your application",
    },
];

static RESTAURANT_STAGES: &[StageDefinition] = &[
    StageDefinition {
        id: 1,
        title: "Business Information",
        description: "Restaurant name, cuisine and location",
    },
    StageDefinition {
        id: 2,
        title: "Owner Information",
        description: "Owner identity and contact details",
    },
    StageDefinition {
        id: 3,
        title: "Menu & Operations",
        description: "Opening hours, menu and delivery settings",
    },
    StageDefinition {
        id: 4,
        title: "Document Upload",
        description: "Business license, food safety and tax documents",
    },
    StageDefinition {
        id: 5,
        title: "Payment Setup",
        description: "Registration fee and payout account",
    },
    StageDefinition {
        id: 6,
        title: "Review & Submit",
        description: "Confirm your details and submit your application",
    },
];

/// Ordered stage definitions for a user type.
pub fn stages_for(user_type: UserType) -> &'static [StageDefinition] {
    match user_type {
        UserType::Driver => DRIVER_STAGES,
        UserType::Restaurant => RESTAURANT_STAGES,
    }
}

/// Number of stages in a user type's wizard.
pub fn total_stages(user_type: UserType) -> u32 {
    stages_for(user_type).len() as u32
}

/// Find a single stage definition.
pub fn stage(user_type: UserType, stage_id: u32) -> Option<&'static StageDefinition> {
    stages_for(user_type).iter().find(|s| s.id == stage_id)
}
