// Doctor Entity

use super::{DoctorId, Gender};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    pub id: DoctorId,
    pub name: String,
    pub gender: Option<Gender>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// Free text (e.g. "Cardiologia")
    pub specialty: Option<String>,
}

impl Doctor {
    pub fn new(id: DoctorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gender: None,
            phone: None,
            email: None,
            specialty: None,
        }
    }
}
