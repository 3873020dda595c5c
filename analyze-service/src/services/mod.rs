pub mod image;
pub mod prompt;
pub mod providers;

pub use self::image::{decode_base64_image, DecodedImage, ImageDecodeError};
pub use self::prompt::PromptStyle;
pub use self::providers::{ProviderError, ProviderResponse, VisionProvider};
