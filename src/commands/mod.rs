pub mod release;

pub use release::{ReleaseArgs, ReleaseCommand};

use crate::result::Result;

#[derive(Debug)]
pub enum CommandType {
    Release(ReleaseArgs),
}

impl CommandType {
    /// Exit code of the finished command.
    pub async fn execute(self) -> Result<i32> {
        match self {
            CommandType::Release(args) => release::execute(args).await,
        }
    }
}

#[derive(Default)]
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn new() -> Self {
        Self
    }

    pub async fn release(&mut self, args: ReleaseArgs) -> Result<i32> {
        CommandType::Release(args).execute().await
    }
}
