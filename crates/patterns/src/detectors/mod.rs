//! One detector per pattern family.

mod double;
mod flag;
mod head_and_shoulders;
mod triangle;
mod wedge;

use configuration::PatternParams;
use core_types::PatternKind;

use crate::detector::PatternDetector;

pub use double::{DoubleBottom, DoubleTop};
pub use flag::{BearFlag, BullFlag};
pub use head_and_shoulders::HeadAndShoulders;
pub use triangle::{AscendingTriangle, DescendingTriangle, SymmetricalTriangle};
pub use wedge::{FallingWedge, RisingWedge};

/// Builds the detector for `kind`.
pub fn create_detector(kind: PatternKind, params: &PatternParams) -> Box<dyn PatternDetector> {
    let params = params.clone();
    match kind {
        PatternKind::HeadAndShoulders => Box::new(HeadAndShoulders::new(params)),
        PatternKind::DoubleTop => Box::new(DoubleTop::new(params)),
        PatternKind::DoubleBottom => Box::new(DoubleBottom::new(params)),
        PatternKind::AscendingTriangle => Box::new(AscendingTriangle::new(params)),
        PatternKind::DescendingTriangle => Box::new(DescendingTriangle::new(params)),
        PatternKind::SymmetricalTriangle => Box::new(SymmetricalTriangle::new(params)),
        PatternKind::BullFlag => Box::new(BullFlag::new(params)),
        PatternKind::BearFlag => Box::new(BearFlag::new(params)),
        PatternKind::RisingWedge => Box::new(RisingWedge::new(params)),
        PatternKind::FallingWedge => Box::new(FallingWedge::new(params)),
    }
}
