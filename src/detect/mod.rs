//! Object detection: the three-stage sliding-window cascade plus training.

pub mod criteria;
pub mod hasher;
pub mod matcher;
pub mod nms;
pub mod objectness;
pub mod pyramid;
pub mod scene;
pub mod template;
pub mod window;

pub use criteria::Criteria;
pub use hasher::{generate_triplets, train_hash_tables, verify_window, HashKey, HashTable, Triplet};
pub use matcher::{match_window, Detection};
pub use nms::non_max_suppression;
pub use objectness::objectness_windows;
pub use pyramid::detect;
pub use scene::Scene;
pub use template::{train_template, Template, TemplateSource};
pub use window::Window;
