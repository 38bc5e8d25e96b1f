pub mod agent_service;
pub mod clone_service;
pub mod export_service;
pub mod migration_service;
pub mod tariff_service;
pub mod update_service;
pub mod vgroup_service;
