pub mod scrollback;
pub mod terminal_pane;
