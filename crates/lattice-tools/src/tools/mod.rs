//! Concrete built-in tool implementations.

mod bash;
mod edit_file;
mod glob_tool;
mod grep_tool;
mod read_file;
mod write_file;

pub use bash::BashTool;
pub use edit_file::EditFileTool;
pub use glob_tool::GlobTool;
pub use grep_tool::GrepTool;
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;
