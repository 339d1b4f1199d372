//! Model evaluation components

pub mod aggregator;
pub mod inference;
pub mod loader;
pub mod logistic;
pub mod scaler;
pub mod tree;

pub use aggregator::Ensemble;
pub use inference::{InferenceEngine, Prediction};
pub use loader::{ArtifactPaths, LoadedModels, ModelLoader};
pub use logistic::LogisticModel;
pub use scaler::{FeatureScale, Scaler};
pub use tree::{ClassDistribution, DecisionTree, TreeNode, MAX_TREE_DEPTH};
