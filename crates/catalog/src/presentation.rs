//! Display-side view of filtered products.
//!
//! Everything here takes pivot-unit data and a display currency. Rounding
//! happens only in this module.

use serde::Serialize;

use vitrine_core::{ProductId, VariantId};

use crate::currency::{Currency, from_pivot};
use crate::product::{Media, Product, Variant};

/// A price converted into the display currency.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceTag {
    pub amount: f64,
    /// Catalog price when a promotion lowers the amount.
    pub was: Option<f64>,
    pub currency: String,
    pub formatted: String,
}

impl PriceTag {
    pub fn for_variant(variant: &Variant, display: &Currency) -> Self {
        let amount = display.round(from_pivot(variant.effective_price_in_pivot(), display));
        let was = variant
            .is_on_promotion()
            .then(|| display.round(from_pivot(variant.catalog_price_in_pivot(), display)));

        Self {
            amount,
            was,
            currency: display.code.clone(),
            formatted: display.format(amount),
        }
    }
}

/// Listing tile for one product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: ProductId,
    pub title: String,
    pub design: Option<String>,
    pub cover: Option<Media>,
    /// Variant whose price is shown (the cheapest one).
    pub variant_id: Option<VariantId>,
    pub price: Option<PriceTag>,
    pub variant_count: usize,
}

impl ProductCard {
    /// Build a card from an already post-filtered product.
    pub fn from_product(product: &Product, display: &Currency) -> Self {
        let cheapest = product.variants.iter().min_by(|a, b| {
            a.effective_price_in_pivot()
                .total_cmp(&b.effective_price_in_pivot())
        });

        Self {
            id: product.id,
            title: product.title.clone(),
            design: product.design.as_ref().map(|d| d.name.clone()),
            cover: cover_media(product).cloned(),
            variant_id: cheapest.map(|v| v.id),
            price: cheapest.map(|v| PriceTag::for_variant(v, display)),
            variant_count: product.variants.len(),
        }
    }
}

/// First still image across variants, falling back to the first media of any kind.
pub fn cover_media(product: &Product) -> Option<&Media> {
    let mut all = product.variants.iter().flat_map(|v| v.media.iter());
    let first = product.variants.iter().flat_map(|v| v.media.iter()).next();
    all.find(|m| !m.is_video).or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::fixtures::{foreign, pivot, product, variant};

    #[test]
    fn price_tag_converts_from_pivot_and_rounds() {
        let v = variant(1, 1, 1, 1, 33.333);
        let tag = PriceTag::for_variant(&v, &foreign(3.0));
        assert_eq!(tag.amount, 100.0);
        assert_eq!(tag.formatted, "100.00 MAD");
        assert_eq!(tag.was, None);
    }

    #[test]
    fn promotion_keeps_catalog_price_as_was() {
        let mut v = variant(1, 1, 1, 1, 100.0);
        v.promotion_price = Some(75.0);
        let tag = PriceTag::for_variant(&v, &pivot());
        assert_eq!(tag.amount, 75.0);
        assert_eq!(tag.was, Some(100.0));
        assert_eq!(tag.currency, "EUR");
    }

    #[test]
    fn card_shows_cheapest_variant_and_first_image() {
        let mut a = variant(1, 9, 1, 1, 80.0);
        a.media = vec![Media::video("a.mp4")];
        let mut b = variant(2, 9, 2, 1, 60.0);
        b.media = vec![Media::image("b.jpg")];

        let card = ProductCard::from_product(&product(9, "Djellaba", vec![a, b]), &pivot());
        assert_eq!(card.variant_id, Some(VariantId::new(2)));
        assert_eq!(card.price.unwrap().amount, 60.0);
        assert_eq!(card.cover, Some(Media::image("b.jpg")));
        assert_eq!(card.variant_count, 2);
    }

    #[test]
    fn cover_falls_back_to_video() {
        let mut a = variant(1, 9, 1, 1, 80.0);
        a.media = vec![Media::video("a.mp4")];
        let p = product(9, "Djellaba", vec![a]);
        assert_eq!(cover_media(&p), Some(&Media::video("a.mp4")));
        assert_eq!(cover_media(&product(1, "Bare", vec![])), None);
    }
}
