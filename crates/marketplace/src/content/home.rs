//! Landing page blocks.

use serde::{Deserialize, Serialize};

use super::{ContentError, StreamBlock, check_block_count, check_chars, check_len};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum HomeBlock {
    Hero(HeroBlock),
    About(AboutBlock),
    Features(FeaturesBlock),
    Services(ServicesBlock),
    Events(EventsBlock),
    Testimonials(TestimonialsBlock),
    Gallery(GalleryBlock),
    Team(TeamBlock),
    Contact(ContactBlock),
    TextImage(TextImageBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeroBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub background_image: String,
    #[serde(default)]
    pub button_text_1: String,
    #[serde(default)]
    pub button_url_1: String,
    #[serde(default)]
    pub button_text_2: String,
    #[serde(default)]
    pub button_url_2: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutBlock {
    pub title: String,
    /// Rich text (HTML).
    pub description: String,
    pub image: String,
    pub features: Vec<AboutFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AboutFeature {
    pub feature_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub features: Vec<NumberedFeature>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumberedFeature {
    pub number: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub services: Vec<ServiceTab>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceTab {
    pub tab_title: String,
    pub service_title: String,
    /// Rich text (HTML).
    pub description: String,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsBlock {
    pub background_image: String,
    pub events: Vec<EventSlide>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSlide {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Rich text (HTML).
    pub description: String,
    pub image: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestimonialsBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub testimonials: Vec<Testimonial>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Testimonial {
    pub quote: String,
    pub name: String,
    pub title: String,
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub gallery_images: Vec<GalleryImage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryImage {
    pub image: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub alt_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub team_members: Vec<TeamMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
    pub name: String,
    pub position: String,
    pub photo: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub social_twitter: String,
    #[serde(default)]
    pub social_facebook: String,
    #[serde(default)]
    pub social_instagram: String,
    #[serde(default)]
    pub social_linkedin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactBlock {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    /// Raw iframe markup from the map provider.
    #[serde(default)]
    pub map_embed_code: String,
    #[serde(default)]
    pub contact_info: Vec<ContactInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    pub icon: String,
    pub title: String,
    /// Rich text (HTML).
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextImageBlock {
    pub title: String,
    /// Rich text (HTML).
    pub content: String,
    pub image: String,
    #[serde(default)]
    pub image_position: ImagePosition,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePosition {
    Left,
    #[default]
    Right,
}

impl ImagePosition {
    #[must_use]
    pub const fn is_left(self) -> bool {
        matches!(self, Self::Left)
    }
}

impl HomeBlock {
    fn validate(&self) -> Result<(), ContentError> {
        match self {
            Self::Hero(b) => {
                check_chars("button_text_1", &b.button_text_1, 50)?;
                check_chars("button_text_2", &b.button_text_2, 50)
            }
            Self::About(b) => check_len("features", b.features.len(), 1, 5),
            Self::Features(b) => {
                check_len("features", b.features.len(), 1, 6)?;
                b.features
                    .iter()
                    .try_for_each(|f| check_chars("number", &f.number, 10))
            }
            Self::Services(b) => check_len("services", b.services.len(), 1, 8),
            Self::Events(b) => {
                check_len("events", b.events.len(), 1, 6)?;
                b.events.iter().try_for_each(|e| {
                    check_chars("subtitle", &e.subtitle, 50)?;
                    check_len("event features", e.features.len(), 0, 5)
                })
            }
            Self::Testimonials(b) => check_len("testimonials", b.testimonials.len(), 1, 10),
            Self::Gallery(b) => check_len("gallery_images", b.gallery_images.len(), 1, 20),
            Self::Team(b) => check_len("team_members", b.team_members.len(), 1, 12),
            Self::Contact(b) => check_len("contact_info", b.contact_info.len(), 0, 8),
            Self::TextImage(_) => Ok(()),
        }
    }
}

/// Validate a landing page body: at most one hero and one contact block.
///
/// # Errors
///
/// Returns the first `ContentError` found.
pub fn validate(blocks: &[StreamBlock<HomeBlock>]) -> Result<(), ContentError> {
    check_block_count(blocks, "hero", 1, |b| matches!(b, HomeBlock::Hero(_)))?;
    check_block_count(blocks, "contact", 1, |b| matches!(b, HomeBlock::Contact(_)))?;
    blocks.iter().try_for_each(|b| b.block.validate())
}
