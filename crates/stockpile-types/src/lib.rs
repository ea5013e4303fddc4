// Core types for the Stockpile resource ledgers
//
// Value types shared by every component (addresses, token ids, resource
// names, fixed-point amounts) and the traits through which the ledgers
// consult external collaborators.

pub mod address;
pub mod amount;
pub mod collaborators;
pub mod error;
pub mod resource;
pub mod token;

pub use address::Address;
pub use amount::{Amount, DECIMALS};
pub use collaborators::{
    AccessControlList, AssetToken, AssetTokenDirectory, Authorization, Collaborators,
    InMemoryAssetToken, ResourceTypeRegistry, ResourceTypeSet,
};
pub use error::TypesError;
pub use resource::ResourceType;
pub use token::{PrimaryRef, TokenId};
