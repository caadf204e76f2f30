mod asset_repo;
mod job_repo;

pub use asset_repo::AssetRepo;
pub use job_repo::JobRepo;
