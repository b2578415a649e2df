//! Response localization: language negotiation, message bundles and
//! machine translation of APOD text.

pub mod language;
pub mod locales;
pub mod providers;
pub mod translation_cache;
pub mod translator;

pub use language::{Language, supported_languages};
pub use locales::Locales;
pub use translation_cache::{TranslationKey, TwoTierTranslationCache};
pub use translator::Translator;
