//! # Repository Module
//!
//! Read-only repositories over the EasyTrade schema.
//!
//! ## Tables Used
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dir_goods                          dir_prices                          │
//! │  ─────────                          ──────────                          │
//! │  gd_id ◄──────────────────────────── prc_good                           │
//! │  gd_code                            prc_type                            │
//! │  gd_name                            prc_value                           │
//! │  gd_unit                            prc_last_update                     │
//! │  gd_articul                                                             │
//! │  gd_description                                                         │
//! │  gd_deleted_mark / gd_deleted                                           │
//! │  gd_last_update                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`GoodsRepository`](goods::GoodsRepository) - Goods change timestamp and export rows
//! - [`PriceRepository`](prices::PriceRepository) - Price change timestamp

pub mod goods;
pub mod prices;
