//! Storefront products.
//!
//! The storefront shows a fixed demo catalog followed by the products sellers
//! create through the Sell form. A seller-created product carries a
//! `listingId` back-reference so edits and deletes on the listing reach it.

use serde::{Deserialize, Serialize};

use recraft_core::{ListingId, Price, ProductId};

/// Quality label given to products created from a listing.
pub const LISTED_QUALITY: &str = "New";

/// A storefront entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Image reference (URL path or data URL).
    pub image: String,
    /// Display price such as `"₹2,500"`.
    pub price: String,
    pub quality: String,
    pub location: String,
    pub description: String,
    pub rating: f64,
    pub stock: u32,
    /// The listing this product was created from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<ListingId>,
}

impl Product {
    /// Price parsed back from the display string.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        Price::from_display_lossy(&self.price)
    }
}

struct Seed {
    name: &'static str,
    image: &'static str,
    rupees: i64,
    quality: &'static str,
    location: &'static str,
    rating: f64,
    description: &'static str,
}

const SEED_STOCK: u32 = 6;

const SEEDS: [Seed; 6] = [
    Seed {
        name: "Seed Paper Cover Notebook",
        image: "/assets/seed.jpg",
        rupees: 2_500,
        quality: "Good",
        location: "Bangalore",
        rating: 4.5,
        description: "Handcrafted eco-friendly notebook with a seed paper cover that can be planted after use. Made using 100% recycled paper.",
    },
    Seed {
        name: "Boho Coco Shells",
        image: "/assets/shell.jpg",
        rupees: 1_200,
        quality: "Excellent",
        location: "Mumbai",
        rating: 4.8,
        description: "A set of handcrafted bowls made from upcycled coconut shells, polished and decorated in boho style.",
    },
    Seed {
        name: "Layer Pallet Bed",
        image: "/assets/table.jpg",
        rupees: 3_000,
        quality: "Good",
        location: "Delhi",
        rating: 4.7,
        description: "A sturdy bed frame built entirely from reclaimed wooden pallets, sanded and coated for a smooth rustic finish.",
    },
    Seed {
        name: "Paper Storage Basket",
        image: "/assets/paper.jpg",
        rupees: 1_800,
        quality: "Very Good",
        location: "Hyderabad",
        rating: 4.6,
        description: "Lightweight basket woven from recycled paper ropes for stationery, craft supplies or small household items.",
    },
    Seed {
        name: "Fabric Wall Hangings",
        image: "/assets/hang.jpg",
        rupees: 2_000,
        quality: "Excellent",
        location: "Chennai",
        rating: 4.9,
        description: "Handmade wall decor crafted from upcycled textile scraps.",
    },
    Seed {
        name: "Coconut Shell Pen Stand",
        image: "/assets/coconut.jpg",
        rupees: 2_200,
        quality: "Good",
        location: "Pune",
        rating: 4.4,
        description: "Pen stand made from natural coconut shells, a desk accessory rooted in traditional craftsmanship.",
    },
];

/// The built-in demo catalog, ids 1 through 6.
#[must_use]
pub fn seed_catalog() -> Vec<Product> {
    (1..)
        .zip(SEEDS.iter())
        .map(|(id, seed)| Product {
            id: ProductId::new(id),
            name: seed.name.to_owned(),
            image: seed.image.to_owned(),
            price: Price::from_rupees(seed.rupees).display(),
            quality: seed.quality.to_owned(),
            location: seed.location.to_owned(),
            description: seed.description.to_owned(),
            rating: seed.rating,
            stock: SEED_STOCK,
            listing_id: None,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_ids_and_prices() {
        let catalog = seed_catalog();
        assert_eq!(catalog.len(), 6);
        assert_eq!(catalog[0].id, ProductId::new(1));
        assert_eq!(catalog[5].id, ProductId::new(6));
        assert_eq!(catalog[0].price, "₹2,500");
        assert_eq!(catalog[1].unit_price(), Price::from_rupees(1_200));
        assert!(catalog.iter().all(|p| p.listing_id.is_none() && p.stock == 6));
    }

    #[test]
    fn test_listing_id_uses_camel_case() {
        let mut product = seed_catalog().remove(0);
        product.listing_id = Some(ListingId::new("abc"));
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["listingId"], "abc");
    }
}
