// src/models/permissions.rs

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::common::fields::{is_truthy, Fields};
use crate::models::access::Role;

// ---
// Catálogo de permissões dos técnicos
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    Agenda,
    Clientes,
    Patio,
    PatioEdit,
    Financeiro,
}

impl PermissionKey {
    /// Nomes gravados no mapa `permissions` dos registros. Não mudar.
    pub const fn as_str(self) -> &'static str {
        match self {
            PermissionKey::Agenda => "agenda",
            PermissionKey::Clientes => "clientes",
            PermissionKey::Patio => "patio",
            PermissionKey::PatioEdit => "patio_edit",
            PermissionKey::Financeiro => "financeiro",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        PERMISSION_CATALOG
            .iter()
            .map(|entry| entry.key)
            .find(|key| key.as_str() == raw)
    }

    pub fn catalog_entry(self) -> &'static PermissionCatalogEntry {
        PERMISSION_CATALOG
            .iter()
            .find(|entry| entry.key == self)
            .unwrap_or(&PERMISSION_CATALOG[0])
    }
}

impl fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct PermissionCatalogEntry {
    pub key: PermissionKey,
    pub label: &'static str,
    pub description: &'static str,
    pub nav_page: Option<Page>,
    pub show_in_nav: bool,
    pub depends_on: Option<PermissionKey>,
}

pub static PERMISSION_CATALOG: [PermissionCatalogEntry; 5] = [
    PermissionCatalogEntry {
        key: PermissionKey::Agenda,
        label: "Agenda da oficina",
        description: "Permite visualizar e gerenciar os agendamentos do dia.",
        nav_page: Some(Page::Agenda),
        show_in_nav: true,
        depends_on: None,
    },
    PermissionCatalogEntry {
        key: PermissionKey::Clientes,
        label: "Clientes e veículos",
        description: "Autoriza o acesso ao cadastro e consulta de clientes.",
        nav_page: Some(Page::Clientes),
        show_in_nav: true,
        depends_on: None,
    },
    PermissionCatalogEntry {
        key: PermissionKey::Patio,
        label: "Controle de pátio",
        description: "Permite visualizar os veículos que estão na oficina.",
        nav_page: Some(Page::Patio),
        show_in_nav: true,
        depends_on: None,
    },
    PermissionCatalogEntry {
        key: PermissionKey::PatioEdit,
        label: "Editar pátio",
        description: "Libera registrar entradas, editar e liberar veículos.",
        nav_page: None,
        show_in_nav: false,
        depends_on: Some(PermissionKey::Patio),
    },
    PermissionCatalogEntry {
        key: PermissionKey::Financeiro,
        label: "Financeiro",
        description: "Disponibiliza a aba Financeiro com receitas e despesas.",
        nav_page: Some(Page::Financeiro),
        show_in_nav: true,
        depends_on: None,
    },
];

// ---
// O conjunto normalizado
// ---

/// Sempre tem exatamente as chaves do catálogo. Qualquer formato gravado
/// (chaves faltando, valores não booleanos, chaves antigas) é normalizado ao
/// desserializar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(from = "Value")]
pub struct Permissions {
    pub agenda: bool,
    pub clientes: bool,
    pub patio: bool,
    pub patio_edit: bool,
    pub financeiro: bool,
}

impl Permissions {
    /// Tudo liberado; é o que o administrador enxerga.
    pub const fn all() -> Self {
        Self { agenda: true, clientes: true, patio: true, patio_edit: true, financeiro: true }
    }

    pub fn from_untrusted(raw: &Fields) -> Self {
        let mut permissions = Self::default();
        for entry in PERMISSION_CATALOG.iter() {
            let granted = raw.get(entry.key.as_str()).map(is_truthy).unwrap_or(false);
            permissions.set(entry.key, granted);
        }
        permissions
    }

    pub fn from_value(raw: &Value) -> Self {
        match raw {
            Value::Object(map) => Self::from_untrusted(map),
            _ => Self::default(),
        }
    }

    pub fn get(&self, key: PermissionKey) -> bool {
        match key {
            PermissionKey::Agenda => self.agenda,
            PermissionKey::Clientes => self.clientes,
            PermissionKey::Patio => self.patio,
            PermissionKey::PatioEdit => self.patio_edit,
            PermissionKey::Financeiro => self.financeiro,
        }
    }

    fn set(&mut self, key: PermissionKey, value: bool) {
        match key {
            PermissionKey::Agenda => self.agenda = value,
            PermissionKey::Clientes => self.clientes = value,
            PermissionKey::Patio => self.patio = value,
            PermissionKey::PatioEdit => self.patio_edit = value,
            PermissionKey::Financeiro => self.financeiro = value,
        }
    }

    /// Liga/desliga uma permissão respeitando as dependências do catálogo:
    /// desligar `patio` desliga `patio_edit` na mesma atualização, e uma
    /// permissão dependente não liga enquanto a base estiver desligada.
    pub fn toggle(self, key: PermissionKey, enabled: bool) -> Self {
        let mut next = self;
        if enabled {
            if let Some(base) = key.catalog_entry().depends_on {
                if !next.get(base) {
                    return next;
                }
            }
        }
        next.set(key, enabled);
        if !enabled {
            for entry in PERMISSION_CATALOG.iter().filter(|e| e.depends_on == Some(key)) {
                next.set(entry.key, false);
            }
        }
        next
    }

    /// Garante a invariante das dependências num conjunto vindo inteiro do formulário.
    pub fn normalized(self) -> Self {
        let mut next = self;
        for entry in PERMISSION_CATALOG.iter() {
            if let Some(base) = entry.depends_on {
                if !next.get(base) {
                    next.set(entry.key, false);
                }
            }
        }
        next
    }

    pub fn any_granted(&self) -> bool {
        PERMISSION_CATALOG.iter().any(|entry| self.get(entry.key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PermissionKey, bool)> + '_ {
        PERMISSION_CATALOG.iter().map(move |entry| (entry.key, self.get(entry.key)))
    }

    pub fn to_fields(&self) -> Fields {
        self.iter()
            .map(|(key, granted)| (key.as_str().to_string(), Value::Bool(granted)))
            .collect()
    }

    /// Entradas do catálogo marcadas para o menu cuja permissão está liberada.
    pub fn nav_items(&self) -> Vec<NavItem> {
        PERMISSION_CATALOG
            .iter()
            .filter(|entry| entry.show_in_nav && self.get(entry.key))
            .filter_map(|entry| {
                entry.nav_page.map(|page| NavItem { id: page, label: entry.label.to_string() })
            })
            .collect()
    }
}

impl From<Value> for Permissions {
    fn from(raw: Value) -> Self {
        Self::from_value(&raw)
    }
}

// ---
// Páginas e menu
// ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    Dashboard,
    Agenda,
    Clientes,
    Profissionais,
    Servicos,
    Orcamentos,
    Patio,
    Estoque,
    Financeiro,
    Configuracoes,
    Conta,
}

/// O que um técnico precisa para abrir uma página.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequirement {
    Open,
    Permission(PermissionKey),
    AdminOnly,
}

impl Page {
    pub const DEFAULT: Page = Page::Dashboard;

    pub const fn as_str(self) -> &'static str {
        match self {
            Page::Dashboard => "dashboard",
            Page::Agenda => "agenda",
            Page::Clientes => "clientes",
            Page::Profissionais => "profissionais",
            Page::Servicos => "servicos",
            Page::Orcamentos => "orcamentos",
            Page::Patio => "patio",
            Page::Estoque => "estoque",
            Page::Financeiro => "financeiro",
            Page::Configuracoes => "configuracoes",
            Page::Conta => "conta",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ADMIN_NAV
            .iter()
            .map(|(page, _)| *page)
            .chain(std::iter::once(Page::Conta))
            .find(|page| page.as_str() == raw)
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Conta => "Minha conta",
            other => ADMIN_NAV
                .iter()
                .find(|(page, _)| *page == other)
                .map(|(_, label)| *label)
                .unwrap_or("Painel"),
        }
    }

    pub fn employee_requirement(self) -> PageRequirement {
        match self {
            Page::Dashboard | Page::Conta => PageRequirement::Open,
            Page::Agenda => PageRequirement::Permission(PermissionKey::Agenda),
            Page::Clientes => PageRequirement::Permission(PermissionKey::Clientes),
            Page::Patio => PageRequirement::Permission(PermissionKey::Patio),
            Page::Financeiro => PageRequirement::Permission(PermissionKey::Financeiro),
            Page::Profissionais
            | Page::Servicos
            | Page::Orcamentos
            | Page::Estoque
            | Page::Configuracoes => PageRequirement::AdminOnly,
        }
    }

    /// Páginas que continuam acessíveis com a assinatura inativa.
    pub fn exempt_from_subscription(self) -> bool {
        matches!(self, Page::Conta | Page::Configuracoes)
    }
}

const ADMIN_NAV: [(Page, &str); 10] = [
    (Page::Dashboard, "Painel"),
    (Page::Agenda, "Agenda da oficina"),
    (Page::Clientes, "Clientes e veículos"),
    (Page::Profissionais, "Equipe técnica"),
    (Page::Servicos, "Serviços da oficina"),
    (Page::Orcamentos, "Orçamentos"),
    (Page::Patio, "Controle de pátio"),
    (Page::Estoque, "Estoque"),
    (Page::Financeiro, "Financeiro"),
    (Page::Configuracoes, "Configurações"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct NavItem {
    pub id: Page,
    pub label: String,
}

/// Menu completo: administrador vê tudo; técnico vê painel, as áreas liberadas e a conta.
pub fn navigation_for(role: Role, permissions: &Permissions) -> Vec<NavItem> {
    match role {
        Role::Admin => ADMIN_NAV
            .iter()
            .map(|(page, label)| NavItem { id: *page, label: label.to_string() })
            .collect(),
        Role::Employee => {
            let mut items = vec![NavItem { id: Page::Dashboard, label: Page::Dashboard.label().to_string() }];
            items.extend(permissions.nav_items());
            items.push(NavItem { id: Page::Conta, label: Page::Conta.label().to_string() });
            items
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn arbitrary_json() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
            Just(json!({})),
            Just(json!([1])),
        ]
    }

    fn raw_permission_map() -> impl Strategy<Value = Fields> {
        let keys = prop_oneof![
            Just("agenda".to_string()),
            Just("clientes".to_string()),
            Just("patio".to_string()),
            Just("patio_edit".to_string()),
            Just("financeiro".to_string()),
            "[a-z_]{1,8}",
        ];
        prop::collection::btree_map(keys, arbitrary_json(), 0..8)
            .prop_map(|map| map.into_iter().collect::<Fields>())
    }

    proptest! {
        #[test]
        fn normalized_shape_has_exactly_the_catalog_keys(raw in raw_permission_map()) {
            let permissions = Permissions::from_untrusted(&raw);
            let serialized = serde_json::to_value(permissions).unwrap();
            let object = serialized.as_object().unwrap();

            prop_assert_eq!(object.len(), PERMISSION_CATALOG.len());
            for entry in PERMISSION_CATALOG.iter() {
                let value = object.get(entry.key.as_str()).unwrap();
                prop_assert!(value.is_boolean());
                let expected = raw.get(entry.key.as_str()).map(is_truthy).unwrap_or(false);
                prop_assert_eq!(value.as_bool().unwrap(), expected);
            }
        }

        #[test]
        fn turning_patio_off_always_clears_patio_edit(raw in raw_permission_map()) {
            let next = Permissions::from_untrusted(&raw).toggle(PermissionKey::Patio, false);
            prop_assert!(!next.patio);
            prop_assert!(!next.patio_edit);
        }
    }

    #[test]
    fn missing_keys_default_to_false() {
        let permissions = Permissions::from_value(&json!({ "agenda": true, "legacy_key": true }));
        assert_eq!(
            permissions,
            Permissions { agenda: true, ..Permissions::default() }
        );
        assert_eq!(Permissions::from_value(&json!("garbage")), Permissions::default());
    }

    #[test]
    fn deserializing_any_shape_normalizes() {
        let permissions: Permissions =
            serde_json::from_value(json!({ "patio": 1, "financeiro": "" })).unwrap();
        assert!(permissions.patio);
        assert!(!permissions.financeiro);
    }

    #[test]
    fn dependent_permission_needs_its_base() {
        let off = Permissions::default().toggle(PermissionKey::PatioEdit, true);
        assert!(!off.patio_edit);

        let on = Permissions::default()
            .toggle(PermissionKey::Patio, true)
            .toggle(PermissionKey::PatioEdit, true);
        assert!(on.patio && on.patio_edit);

        let stale = Permissions { patio_edit: true, ..Permissions::default() };
        assert!(!stale.normalized().patio_edit);
    }

    #[test]
    fn nav_lists_only_granted_visible_entries() {
        let permissions = Permissions { agenda: true, patio_edit: true, financeiro: true, ..Permissions::default() };
        let ids: Vec<Page> = permissions.nav_items().into_iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![Page::Agenda, Page::Financeiro]);

        let employee_nav: Vec<Page> = navigation_for(Role::Employee, &permissions)
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(employee_nav, vec![Page::Dashboard, Page::Agenda, Page::Financeiro, Page::Conta]);
    }

    #[test]
    fn pages_round_trip_through_their_ids() {
        for raw in ["dashboard", "financeiro", "conta", "estoque"] {
            assert_eq!(Page::parse(raw).map(Page::as_str), Some(raw));
        }
        assert_eq!(Page::parse("admin"), None);
    }
}
