mod painter;
mod state_view;
mod table;

pub(crate) use self::painter::Painter;
pub(crate) use self::state_view::{StateReport, StateReportView};
