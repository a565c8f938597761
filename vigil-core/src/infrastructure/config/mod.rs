pub mod project;

pub use project::{
    CONFIG_CANDIDATES, DatasourceConfig, ProjectConfig, STARTER_CONFIG, find_main_config,
    load_project_config,
};
