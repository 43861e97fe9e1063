#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod carousel;
pub mod config;
pub mod href;
pub mod html;
pub mod selection;
pub mod site;

pub use carousel::{
  CarouselController, CarouselError, CarouselEvent, CarouselParts, CarouselSettings, CarouselState,
  NavControl, Slide,
};
pub use config::BehaviorConfig;
pub use href::{HrefRewriter, LinkElement, transform_href};
pub use html::{HtmlRewrite, rewrite_html_links};
pub use selection::{AllPages, PageInclusion, PageSelection};
pub use site::{SiteReport, SiteRewriter};
