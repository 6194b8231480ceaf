use crate::users::LocalUser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Mosaic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sorting {
    pub by: String,
    pub asc: bool,
}

impl Default for Sorting {
    fn default() -> Self {
        Self {
            by: "name".to_string(),
            asc: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Permissions {
    pub admin: bool,
    pub execute: bool,
    pub create: bool,
    pub rename: bool,
    pub modify: bool,
    pub delete: bool,
    pub share: bool,
    pub download: bool,
}

/// Template applied to users provisioned on first directory login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserDefaults {
    pub scope: String,
    pub locale: String,
    pub view_mode: ViewMode,
    pub single_click: bool,
    pub sorting: Sorting,
    pub perm: Permissions,
    pub commands: Vec<String>,
    pub hide_dotfiles: bool,
    pub date_format: bool,
}

impl Default for UserDefaults {
    fn default() -> Self {
        Self {
            scope: ".".to_string(),
            locale: "en".to_string(),
            view_mode: ViewMode::default(),
            single_click: false,
            sorting: Sorting::default(),
            perm: Permissions::default(),
            commands: Vec::new(),
            hide_dotfiles: false,
            date_format: false,
        }
    }
}

impl UserDefaults {
    /// Copy every preference and permission onto `user`, leaving identity fields alone.
    pub fn apply(&self, user: &mut LocalUser) {
        user.scope.clone_from(&self.scope);
        user.locale.clone_from(&self.locale);
        user.view_mode = self.view_mode;
        user.single_click = self.single_click;
        user.sorting.clone_from(&self.sorting);
        user.perm = self.perm;
        user.commands.clone_from(&self.commands);
        user.hide_dotfiles = self.hide_dotfiles;
        user.date_format = self.date_format;
    }
}
