//! Concrete instantiations of the generic worklist solver (C3): live
//! variables (C4) and constant propagation (C5).

pub mod constprop;
pub mod live;
