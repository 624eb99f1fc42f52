use serde::{Deserialize, Serialize};

use catalog_core::{PackageId, ProductId};
use catalog_products::{Package, PackageContent, Product};

// -------------------------
// Wire schemas
// -------------------------

/// Product as it appears on the wire. Every field is optional when decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSchema {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub sku: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageContentSchema {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackageSchema {
    pub id: i64,
    pub package_name: String,
    pub description: String,
    pub content: Vec<PackageContentSchema>,
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProductRequest {
    pub product: ProductSchema,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PacketRequest {
    pub packet: PackageSchema,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<ProductSchema>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub product: ProductSchema,
}

#[derive(Debug, Serialize)]
pub struct ProductIdResponse {
    pub product_id: i64,
}

#[derive(Debug, Serialize)]
pub struct PacketsResponse {
    pub packets: Vec<PackageSchema>,
}

#[derive(Debug, Serialize)]
pub struct PacketResponse {
    pub packet: PackageSchema,
}

#[derive(Debug, Serialize)]
pub struct PacketIdResponse {
    pub packet_id: i64,
}

/// `{}`
#[derive(Debug, Serialize)]
pub struct EmptyResponse {}

// -------------------------
// Mapping
// -------------------------

impl From<ProductSchema> for Product {
    fn from(s: ProductSchema) -> Self {
        Product {
            id: ProductId::new(s.id),
            name: s.name,
            description: s.description,
            price: s.price,
            image_url: s.image_url,
            sku: s.sku,
        }
    }
}

impl From<Product> for ProductSchema {
    fn from(p: Product) -> Self {
        ProductSchema {
            id: p.id.get(),
            name: p.name,
            description: p.description,
            price: p.price,
            image_url: p.image_url,
            sku: p.sku,
        }
    }
}

impl From<PackageSchema> for Package {
    fn from(s: PackageSchema) -> Self {
        Package {
            id: PackageId::new(s.id),
            name: s.package_name,
            description: s.description,
            contents: s
                .content
                .into_iter()
                .map(|c| PackageContent::new(ProductId::new(c.product_id), c.quantity))
                .collect(),
        }
    }
}

impl From<Package> for PackageSchema {
    fn from(p: Package) -> Self {
        PackageSchema {
            id: p.id.get(),
            package_name: p.name,
            description: p.description,
            content: p
                .contents
                .into_iter()
                .map(|c| PackageContentSchema {
                    product_id: c.product_id.get(),
                    quantity: c.quantity,
                })
                .collect(),
        }
    }
}
