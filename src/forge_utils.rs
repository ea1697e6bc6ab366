pub mod build;

pub use self::build::ForgeBuild;
