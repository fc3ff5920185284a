use serde::Serialize;

/// Categories seeded for a user the first time their list is requested.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Alimentação",
    "Limpeza",
    "Higiene",
    "Bebidas",
    "Padaria",
    "Açougue",
    "Hortifruti",
    "Outros",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: Option<i64>,
    #[serde(skip)]
    pub user_id: String,
    pub name: String,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
