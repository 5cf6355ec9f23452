use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Vehicle class requested by a rider. Fixed at request time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Economy,
    Premium,
    Luxury,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [
        VehicleClass::Economy,
        VehicleClass::Premium,
        VehicleClass::Luxury,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleClass::Economy => "economy",
            VehicleClass::Premium => "premium",
            VehicleClass::Luxury => "luxury",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "economy" => Ok(VehicleClass::Economy),
            "premium" => Ok(VehicleClass::Premium),
            "luxury" => Ok(VehicleClass::Luxury),
            other => Err(Error::invalid_input(format!("unknown vehicle class '{other}'"))),
        }
    }
}
