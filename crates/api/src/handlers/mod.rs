pub mod assets;
pub mod jobs;
pub mod revelacao;
pub mod studio;
