// Clinic Entity

use super::ClinicId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: ClinicId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Clinic {
    pub fn new(id: ClinicId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            address: None,
            phone: None,
            email: None,
        }
    }
}
