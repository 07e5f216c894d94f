pub mod error;
pub mod openai;
pub mod traits;
pub mod util;

pub use error::{AiError, Result};
pub use openai::{ChatOptions, OpenAi, StructuredOutput};
pub use traits::{Completion, Message, MessageRole};
pub use util::{strip_code_blocks, truncate_chars};
