//! Catalog entities: products, their variants and media, and the lookup rows
//! (category, design, color, size, mall, boutique) they reference.

use serde::{Deserialize, Serialize};

use vitrine_core::{
    BoutiqueId, CategoryId, ColorId, DesignId, Entity, MallId, ProductId, SizeId, VariantId,
};

use crate::currency::{Currency, to_pivot};

/// Moderation status shared by products and variants.
///
/// Only `Approved` rows are ever shown in the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }

    pub fn is_approved(self) -> bool {
        self == ApprovalStatus::Approved
    }
}

impl core::str::FromStr for ApprovalStatus {
    type Err = vitrine_core::DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(vitrine_core::DomainError::validation(format!(
                "unknown approval status: {other}"
            ))),
        }
    }
}

/// A still image or video attached to a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    #[serde(default)]
    pub is_video: bool,
}

impl Media {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_video: false,
        }
    }

    pub fn video(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            is_video: true,
        }
    }
}

/// A purchasable color/size/price combination of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    #[serde(default)]
    pub color_id: Option<ColorId>,
    #[serde(default)]
    pub size_id: Option<SizeId>,
    /// Currency the prices are expressed in. `None` means pivot.
    #[serde(default)]
    pub currency: Option<Currency>,
    pub catalog_price: f64,
    /// Promotional price. Its date window is resolved upstream; when present it applies.
    #[serde(default)]
    pub promotion_price: Option<f64>,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl Variant {
    /// Promotional price if present, else catalog price, in the variant's own currency.
    pub fn effective_price(&self) -> f64 {
        self.promotion_price.unwrap_or(self.catalog_price)
    }

    /// Effective price converted to pivot units.
    pub fn effective_price_in_pivot(&self) -> f64 {
        self.in_pivot(self.effective_price())
    }

    pub fn catalog_price_in_pivot(&self) -> f64 {
        self.in_pivot(self.catalog_price)
    }

    pub fn is_on_promotion(&self) -> bool {
        matches!(self.promotion_price, Some(p) if p < self.catalog_price)
    }

    fn in_pivot(&self, amount: f64) -> f64 {
        match &self.currency {
            Some(currency) => to_pivot(amount, currency),
            None => amount,
        }
    }
}

impl Entity for Variant {
    type Id = VariantId;

    fn id(&self) -> VariantId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// Brand / designer label a product is published under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Design {
    pub id: DesignId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub id: ColorId,
    pub name: String,
    /// Swatch value, e.g. `#1a1a1a`.
    #[serde(default)]
    pub hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub id: SizeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mall {
    pub id: MallId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boutique {
    pub id: BoutiqueId,
    pub name: String,
    #[serde(default)]
    pub mall_id: Option<MallId>,
}

macro_rules! impl_lookup_entity {
    ($($ty:ident => $id:ident),+ $(,)?) => {
        $(
            impl Entity for $ty {
                type Id = $id;

                fn id(&self) -> $id {
                    self.id
                }
            }
        )+
    };
}

impl_lookup_entity! {
    Category => CategoryId,
    Design => DesignId,
    Color => ColorId,
    Size => SizeId,
    Mall => MallId,
    Boutique => BoutiqueId,
}

/// Parent catalog row. Variants are kept in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub design: Option<Design>,
    #[serde(default)]
    pub status: ApprovalStatus,
    #[serde(default)]
    pub is_visible: bool,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    pub fn category_id(&self) -> Option<CategoryId> {
        self.category.as_ref().map(|c| c.id)
    }

    /// Approved and visible. Says nothing about variants; see [`crate::VariantFilter`].
    pub fn is_listed(&self) -> bool {
        self.status.is_approved() && self.is_visible
    }

    /// Case-insensitive substring match on title or description.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.title.to_lowercase().contains(&needle)
            || self.description.to_lowercase().contains(&needle)
    }

    /// Lowest catalog price across all variants (approved or not), in pivot units.
    ///
    /// Used for price ordering, which deliberately ignores variant filters.
    pub fn min_catalog_price_in_pivot(&self) -> Option<f64> {
        self.variants
            .iter()
            .map(Variant::catalog_price_in_pivot)
            .min_by(|a, b| a.total_cmp(b))
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}
