//! Well-known label keys, annotation keys and fixed values

/// Label marking records created by the importer
pub const BUILTIN_LABEL_KEY: &str = "application.kubesphere.io/builtin-app";
pub const WORKSPACE_LABEL_KEY: &str = "kubesphere.io/workspace";
pub const CATEGORY_ID_LABEL_KEY: &str = "application.kubesphere.io/app-category-id";
/// Label on version records pointing at the owning application
pub const APPLICATION_ID_LABEL_KEY: &str = "application.kubesphere.io/app-id";

pub const CREATOR_ANNOTATION_KEY: &str = "kubesphere.io/creator";

/// Chart annotation naming the category an application belongs to
pub const CATEGORY_KEY_IN_CHART: &str = "app.kubesphere.io/category";
/// Chart annotation overriding the application display name
pub const DISPLAY_NAME_KEY_IN_CHART: &str = "app.kubesphere.io/display-name";

pub const SYSTEM_WORKSPACE: &str = "system-workspace";

/// Suffix of the secondary application record shown in the app store
pub const STORE_SUFFIX: &str = "-store";

/// Operator recorded on creator annotations and audit entries
pub const OPERATOR: &str = "admin";

pub const DEFAULT_CATEGORY_ICON: &str = "documentation";

pub const CATEGORY_ID_PREFIX: &str = "ctg-";
pub const APPLICATION_ID_PREFIX: &str = "app-";
pub const VERSION_ID_PREFIX: &str = "appv-";

pub const API_GROUP: &str = "application.kubesphere.io";
pub const API_VERSION: &str = "application.kubesphere.io/v1alpha1";
