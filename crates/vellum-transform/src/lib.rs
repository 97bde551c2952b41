//! Document transforms: invertible edit steps, position mapping, and the
//! [`Transform`] orchestrator that builds step sequences for high-level
//! editing operations.
//!
//! Steps are small, serializable, invertible units of change. Position maps
//! describe how a step moves positions, which is what lets concurrent edits
//! be rebased over each other.

mod attr_step;
mod fit;
mod map;
mod mark_step;
mod replace_step;
mod step;
mod structure;
mod transform;

pub use attr_step::{AttrStep, DocAttrStep};
pub use fit::{fits_trivially, replace_step};
pub use map::{MapError, MapResult, Mappable, Mapping, StepMap};
pub use mark_step::{AddMarkStep, AddNodeMarkStep, RemoveMarkStep, RemoveNodeMarkStep};
pub use replace_step::{ReplaceAroundStep, ReplaceStep};
pub use step::{Step, StepError, StepJsonError, StepResult};
pub use structure::{
    can_join, can_split, drop_point, find_wrapping, insert_point, join_point, lift_target,
    Wrapper,
};
pub use transform::{MarkFilter, Transform, TransformError};
