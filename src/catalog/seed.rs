//! Initial catalog contents

use std::fs;
use std::path::Path;

use super::{CatalogError, NewProduct, ProductStore};
use crate::garment::GarmentImages;

const IMAGE_DIR: &str = "/assets/generated_images";

fn images(front: &str, back: &str, left: &str, right: &str) -> GarmentImages {
    GarmentImages {
        front: format!("{}/{}", IMAGE_DIR, front),
        back: format!("{}/{}", IMAGE_DIR, back),
        left: format!("{}/{}", IMAGE_DIR, left),
        right: format!("{}/{}", IMAGE_DIR, right),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The storefront's launch collection
pub fn seed_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "ONYU Signature Tee".to_string(),
            description: "The cornerstone of the ONYU collection. Crafted from 240GSM premium heavyweight cotton, this tee offers a structured yet breathable fit. Features dropped shoulders and a reinforced collar for longevity.".to_string(),
            detailed_description: Some("Designed for ultimate comfort and durability, our signature tee is made from sustainably sourced 240gsm organic cotton. The silicon wash finish provides a luxuriously soft hand-feel, while the reinforced double-stitched seams ensure it maintains its shape through countless wears and washes. Features a contemporary oversized silhouette with dropped shoulders and a thick ribbed collar.".to_string()),
            price: 2499,
            sku: "ONYU-TEE-001".to_string(),
            images: images(
                "signature_tee_front.png",
                "signature_tee_back.png",
                "signature_tee_left.png",
                "signature_tee_right.png",
            ),
            features: strings(&[
                "240GSM Heavyweight Cotton",
                "Oversized Boxy Fit",
                "Reinforced Crew Neck",
                "Eco-friendly Silicon Wash",
            ]),
            sizes: strings(&["XS", "S", "M", "L", "XL", "XXL"]),
            similar_products: vec![2, 3],
        },
        NewProduct {
            name: "ONYU Stealth Hoodie".to_string(),
            description: "Minimalist design meets extreme comfort. Our Stealth Hoodie is made from premium French Terry with a unique water-resistant finish.".to_string(),
            detailed_description: Some("The Stealth Hoodie represents our commitment to performance-led design. Built with 400GSM French Terry fabric, it features a unique water-resistant finish that repels light rain while remaining completely breathable. Includes hidden zippered tech pockets and a double-lined structured hood.".to_string()),
            price: 4999,
            sku: "ONYU-HD-002".to_string(),
            images: images(
                "stealth_hoodie_front.png",
                "stealth_hoodie_back.png",
                "stealth_hoodie_left.png",
                "stealth_hoodie_right.png",
            ),
            features: strings(&[
                "400GSM French Terry",
                "Water-resistant Coating",
                "Hidden Tech Pockets",
                "Double-lined Hood",
            ]),
            sizes: strings(&["S", "M", "L", "XL"]),
            similar_products: vec![1, 3],
        },
        NewProduct {
            name: "ONYU Cargo Joggers".to_string(),
            description: "Utility refined. These joggers feature a technical nylon-stretch blend with six functional pockets.".to_string(),
            detailed_description: Some("Engineered for movement, the ONYU Cargo Joggers blend technical performance with streetwear aesthetics. The 4-way stretch technical nylon fabric provides unrestricted mobility, while the six-pocket configuration offers ample storage for essentials. Features articulated knees and adjustable toggles at the hem.".to_string()),
            price: 3999,
            sku: "ONYU-JG-003".to_string(),
            images: images(
                "cargo_joggers_front.png",
                "cargo_joggers_back.png",
                "cargo_joggers_left.png",
                "cargo_joggers_right.png",
            ),
            features: strings(&[
                "4-Way Stretch Nylon",
                "Articulated Knee Design",
                "Snap-closure Cargo Pockets",
                "Adjustable Tapered Fit",
            ]),
            sizes: strings(&["S", "M", "L", "XL"]),
            similar_products: vec![1, 2],
        },
    ]
}

/// Insert `products` only when the store has nothing yet.
///
/// Returns how many products were inserted.
pub fn seed_if_empty(
    store: &dyn ProductStore,
    products: Vec<NewProduct>,
) -> Result<usize, CatalogError> {
    if !store.is_empty() {
        return Ok(0);
    }
    let count = products.len();
    for product in products {
        store.create(product)?;
    }
    tracing::info!(count, "Seeded product catalog");
    Ok(count)
}

/// Read a JSON array of products from disk
pub fn load_catalog_file(path: &Path) -> Result<Vec<NewProduct>, CatalogError> {
    let contents = fs::read_to_string(path)?;
    let products: Vec<NewProduct> = serde_json::from_str(&contents)?;
    for product in &products {
        product.validate()?;
    }
    Ok(products)
}
