pub mod agent;
pub mod de;
pub mod filter;
pub mod tariff;
pub mod vgroup;

pub use agent::Agent;
pub use filter::RecordFilter;
pub use tariff::{TariffBody, TariffListItem, TariffRecord};
pub use vgroup::{VgroupBody, VgroupDetail, VgroupSummary};
