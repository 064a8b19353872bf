//! Report palette and the mapping from a cell style to an xlsx `Format`.

use pricewise_pricing::pivot::ValueKind;
use pricewise_pricing::report::ColumnKind;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

pub const HEADER_FILL: u32 = 0xD9E1F2;
pub const BELOW_THRESHOLD_FILL: u32 = 0xFFCCCC;
pub const ATTENTION_TAB: u32 = 0xFF9999;
pub const MESSAGE_FONT: u32 = 0x666666;

pub const CURRENCY_FORMAT: &str = r#"_($* #,##0.00_);_($* (#,##0.00);_($* "-"??_);_(@_)"#;
pub const PERCENT_FORMAT: &str = "0.00%";
pub const DATE_FORMAT: &str = "mm/dd/yyyy";

/// Flat-sheet equivalent of a pivot value kind.
pub fn column_kind(kind: ValueKind) -> ColumnKind {
    match kind {
        ValueKind::Currency => ColumnKind::Currency,
        ValueKind::Percent => ColumnKind::Percent,
        ValueKind::Date => ColumnKind::Date,
        ValueKind::Text => ColumnKind::Text,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    General,
    Center,
    Right,
}

/// Medium borders on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub bottom: bool,
    pub left: bool,
    pub right: bool,
}

impl Edges {
    pub fn sides() -> Self {
        Self {
            left: true,
            right: true,
            ..Self::default()
        }
    }

    pub fn with_bottom(mut self, bottom: bool) -> Self {
        self.bottom = bottom;
        self
    }
}

/// Renderer-level description of a cell's look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellStyle {
    pub number_format: Option<&'static str>,
    pub bold: bool,
    pub italic: bool,
    pub font_color: Option<u32>,
    pub fill: Option<u32>,
    pub align: Align,
    pub edges: Edges,
}

impl CellStyle {
    pub fn header() -> Self {
        Self {
            bold: true,
            fill: Some(HEADER_FILL),
            ..Self::default()
        }
    }

    pub fn message() -> Self {
        Self {
            italic: true,
            font_color: Some(MESSAGE_FONT),
            ..Self::default()
        }
    }

    pub fn for_column(kind: ColumnKind) -> Self {
        Self {
            number_format: match kind {
                ColumnKind::Currency => Some(CURRENCY_FORMAT),
                ColumnKind::Percent => Some(PERCENT_FORMAT),
                ColumnKind::Date => Some(DATE_FORMAT),
                ColumnKind::Text | ColumnKind::Number => None,
            },
            ..Self::default()
        }
    }

    pub fn for_value(kind: ValueKind) -> Self {
        Self::for_column(column_kind(kind))
    }

    pub fn filled(mut self, color: u32) -> Self {
        self.fill = Some(color);
        self
    }

    pub fn aligned(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn bordered(mut self, edges: Edges) -> Self {
        self.edges = edges;
        self
    }

    pub fn to_format(&self) -> Format {
        let mut format = Format::new();
        if self.bold {
            format = format.set_bold();
        }
        if self.italic {
            format = format.set_italic();
        }
        if let Some(color) = self.font_color {
            format = format.set_font_color(Color::RGB(color));
        }
        if let Some(color) = self.fill {
            format = format.set_background_color(Color::RGB(color));
        }
        if let Some(code) = self.number_format {
            format = format.set_num_format(code);
        }
        format = match self.align {
            Align::General => format,
            Align::Center => format.set_align(FormatAlign::Center),
            Align::Right => format.set_align(FormatAlign::Right),
        };
        if self.edges.bottom {
            format = format.set_border_bottom(FormatBorder::Medium);
        }
        if self.edges.left {
            format = format.set_border_left(FormatBorder::Medium);
        }
        if self.edges.right {
            format = format.set_border_right(FormatBorder::Medium);
        }
        format
    }
}
