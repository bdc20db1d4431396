// src/models/scope.rs

use crate::db::store::{CollectionPath, DocPath};
use crate::models::access::EmployeeRecord;
use crate::models::records::TenantCollection;

pub const USERS: &str = "users";
pub const EMPLOYEES: &str = "employees";
pub const LEGACY_EMPLOYEES: &str = "employees";

/// Raiz de todos os dados de negócio de uma oficina. Só existe depois que a
/// resolução de papel encontrou o dono; é a única forma de montar caminhos
/// de dados escopados.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantScope {
    owner_uid: String,
}

impl TenantScope {
    /// `ownerUid = employee.adminId || uid`. Um técnico sem `adminId` não tem
    /// escopo: cair para o uid dele apontaria para um tenant vazio.
    pub fn for_identity(uid: &str, employee: Option<&EmployeeRecord>) -> Option<Self> {
        let owner = match employee {
            Some(record) => record.admin_id.as_deref()?,
            None => uid,
        };
        if owner.is_empty() {
            return None;
        }
        Some(Self { owner_uid: owner.to_string() })
    }

    pub fn owner_uid(&self) -> &str {
        &self.owner_uid
    }

    pub fn root(&self) -> DocPath {
        profile_path(&self.owner_uid)
    }

    pub fn collection(&self, collection: TenantCollection) -> CollectionPath {
        self.root().collection(collection.as_str())
    }

    pub fn record(&self, collection: TenantCollection, id: &str) -> DocPath {
        self.collection(collection).doc(id)
    }

    pub fn employees(&self) -> CollectionPath {
        self.root().collection(EMPLOYEES)
    }

    pub fn employee(&self, uid: &str) -> DocPath {
        self.employees().doc(uid)
    }

    pub fn settings(&self) -> DocPath {
        self.root().collection("settings").doc("app")
    }

    pub fn migration_marker(&self) -> DocPath {
        self.root().collection("meta").doc("legacyMigration")
    }
}

/// Perfil plano de qualquer conta (users/{uid}).
pub fn profile_path(uid: &str) -> DocPath {
    CollectionPath::root(USERS).doc(uid)
}

/// Registro plano antigo de técnico (employees/{uid}).
pub fn legacy_employee_path(uid: &str) -> DocPath {
    CollectionPath::root(LEGACY_EMPLOYEES).doc(uid)
}

/// Extrai o dono de um caminho `users/{owner}/employees/{id}`.
pub fn owner_from_employee_path(path: &DocPath) -> Option<String> {
    let segments: Vec<&str> = path.segments().collect();
    match segments.as_slice() {
        [USERS, owner, EMPLOYEES, _] => Some((*owner).to_string()),
        _ => None,
    }
}
