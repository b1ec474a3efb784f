//! Content-stream interpretation.
//!
//! Walks the operators of a page and records where text is shown and which
//! straight segments are painted. Glyph widths are not read from font
//! programs; every glyph is assumed to be [`GLYPH_WIDTH_EM`] wide, which is
//! enough to tell column gaps from word gaps.

use std::collections::BTreeMap;

use lopdf::Object;
use lopdf::content::Operation;

use crate::model::{RuleSegment, TextFragment};
use crate::pdf_reader::decode_pdf_bytes;

pub(crate) const GLYPH_WIDTH_EM: f64 = 0.5;

/// Rectangles thinner than this are painted rules, not boxes.
const RULE_THICKNESS: f64 = 2.0;

/// TJ adjustments (thousandths of an em) beyond this start a new fragment.
const TJ_COLUMN_JUMP: f64 = -1000.0;
const TJ_WORD_GAP: f64 = -100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Self = Self([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn translation(tx: f64, ty: f64) -> Self {
        Self([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other` in the row-vector convention used by PDF.
    fn then(self, other: Self) -> Self {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Self([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    fn apply(self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    fn vertical_scale(self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        c.hypot(d)
    }
}

#[derive(Debug, Clone)]
struct TextState<'a> {
    matrix: Matrix,
    line_matrix: Matrix,
    font_size: f64,
    leading: f64,
    horizontal_scale: f64,
    encoding: Option<&'a str>,
}

impl Default for TextState<'_> {
    fn default() -> Self {
        Self {
            matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
            encoding: None,
        }
    }
}

impl TextState<'_> {
    fn translate_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).then(self.line_matrix);
        self.matrix = self.line_matrix;
    }

    fn glyph_advance(&self) -> f64 {
        self.font_size * GLYPH_WIDTH_EM * self.horizontal_scale
    }

    fn advance(&mut self, tx: f64) {
        self.matrix = Matrix::translation(tx, 0.0).then(self.matrix);
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct PageGeometry {
    pub fragments: Vec<TextFragment>,
    pub rules: Vec<RuleSegment>,
}

struct Interpreter<'a> {
    encodings: &'a BTreeMap<Vec<u8>, &'a str>,
    ctm: Matrix,
    saved: Vec<Matrix>,
    text: TextState<'a>,
    path_start: Option<(f64, f64)>,
    current_point: Option<(f64, f64)>,
    pending: Vec<RuleSegment>,
    out: PageGeometry,
}

fn number(object: &Object) -> Option<f64> {
    match object {
        #[allow(clippy::cast_precision_loss)]
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f64; N]> {
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    (operands.len() >= N).then_some(out)
}

/// Splits shown text on runs of two or more whitespace characters, keeping
/// the character offset of each piece.
fn split_on_wide_gaps(text: &str) -> Vec<(usize, String)> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut start = 0_usize;
    let mut whitespace_run = 0_usize;

    for (index, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            whitespace_run += 1;
            if whitespace_run == 2 && !current.trim().is_empty() {
                pieces.push((start, current.trim_end().to_string()));
                current.clear();
            }
            if whitespace_run >= 2 || current.is_empty() {
                continue;
            }
            current.push(' ');
            continue;
        }

        if current.is_empty() {
            start = index;
        }
        whitespace_run = 0;
        current.push(ch);
    }

    if !current.trim().is_empty() {
        pieces.push((start, current.trim_end().to_string()));
    }
    pieces
}

impl<'a> Interpreter<'a> {
    fn new(encodings: &'a BTreeMap<Vec<u8>, &'a str>) -> Self {
        Self {
            encodings,
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            text: TextState::default(),
            path_start: None,
            current_point: None,
            pending: Vec::new(),
            out: PageGeometry::default(),
        }
    }

    fn emit_text(&mut self, text: &str) {
        let glyph = self.text.glyph_advance();
        let rendering = self.text.matrix.then(self.ctm);
        let font_size = self.text.font_size * rendering.vertical_scale();
        let device_glyph = font_size * GLYPH_WIDTH_EM * self.text.horizontal_scale;

        for (offset, piece) in split_on_wide_gaps(text) {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = rendering.apply(offset as f64 * glyph, 0.0);
            #[allow(clippy::cast_precision_loss)]
            let width = piece.chars().count() as f64 * device_glyph;
            self.out.fragments.push(TextFragment {
                x,
                y,
                width,
                font_size,
                text: piece,
            });
        }

        #[allow(clippy::cast_precision_loss)]
        let advance = text.chars().count() as f64 * glyph;
        self.text.advance(advance);
    }

    fn show_string(&mut self, operand: &Object) {
        if let Object::String(bytes, _) = operand {
            let decoded = decode_pdf_bytes(self.text.encoding, bytes);
            self.emit_text(&decoded);
        }
    }

    fn show_array(&mut self, items: &[Object]) {
        let mut run = String::new();
        for item in items {
            match item {
                Object::String(bytes, _) => {
                    run.push_str(&decode_pdf_bytes(self.text.encoding, bytes));
                }
                other => {
                    let Some(adjustment) = number(other) else {
                        continue;
                    };
                    if adjustment <= TJ_COLUMN_JUMP {
                        let run_text = std::mem::take(&mut run);
                        self.emit_text(&run_text);
                        let shift =
                            -adjustment / 1000.0 * self.text.font_size * self.text.horizontal_scale;
                        self.text.advance(shift);
                    } else if adjustment < TJ_WORD_GAP {
                        run.push(' ');
                    }
                }
            }
        }
        self.emit_text(&run);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        let point = self.ctm.apply(x, y);
        self.path_start = Some(point);
        self.current_point = Some(point);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        let point = self.ctm.apply(x, y);
        if let Some((x0, y0)) = self.current_point {
            self.pending.push(RuleSegment::new(x0, y0, point.0, point.1));
        }
        self.current_point = Some(point);
    }

    fn close_path(&mut self) {
        if let (Some((x0, y0)), Some((x1, y1))) = (self.current_point, self.path_start) {
            if (x0, y0) != (x1, y1) {
                self.pending.push(RuleSegment::new(x0, y0, x1, y1));
            }
            self.current_point = Some((x1, y1));
        }
    }

    fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) {
        if width.abs() <= RULE_THICKNESS || height.abs() <= RULE_THICKNESS {
            let (x0, y0, x1, y1) = if width.abs() <= RULE_THICKNESS {
                let mid = x + width / 2.0;
                (mid, y, mid, y + height)
            } else {
                let mid = y + height / 2.0;
                (x, mid, x + width, mid)
            };
            let start = self.ctm.apply(x0, y0);
            let end = self.ctm.apply(x1, y1);
            self.pending
                .push(RuleSegment::new(start.0, start.1, end.0, end.1));
            return;
        }

        self.move_to(x, y);
        self.line_to(x + width, y);
        self.line_to(x + width, y + height);
        self.line_to(x, y + height);
        self.close_path();
    }

    fn paint(&mut self, keep: bool) {
        if keep {
            self.out.rules.append(&mut self.pending);
        } else {
            self.pending.clear();
        }
        self.path_start = None;
        self.current_point = None;
    }

    fn execute(&mut self, operation: &Operation) {
        let operands = operation.operands.as_slice();
        match operation.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(values) = numbers::<6>(operands) {
                    self.ctm = Matrix(values).then(self.ctm);
                }
            }
            "BT" => {
                self.text.matrix = Matrix::IDENTITY;
                self.text.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                self.text.encoding = operands
                    .first()
                    .and_then(|operand| operand.as_name().ok())
                    .and_then(|name| self.encodings.get(name).copied());
                if let Some(size) = operands.get(1).and_then(number) {
                    self.text.font_size = size;
                }
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    self.text.leading = leading;
                }
            }
            "Tz" => {
                if let Some([scale]) = numbers::<1>(operands) {
                    self.text.horizontal_scale = scale / 100.0;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.text.translate_line(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    self.text.leading = -ty;
                    self.text.translate_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(values) = numbers::<6>(operands) {
                    self.text.line_matrix = Matrix(values);
                    self.text.matrix = self.text.line_matrix;
                }
            }
            "T*" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
            }
            "Tj" => {
                if let Some(operand) = operands.first() {
                    self.show_string(operand);
                }
            }
            "'" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
                if let Some(operand) = operands.first() {
                    self.show_string(operand);
                }
            }
            "\"" => {
                let leading = self.text.leading;
                self.text.translate_line(0.0, -leading);
                if let Some(operand) = operands.get(2) {
                    self.show_string(operand);
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operands.first() {
                    self.show_array(items);
                }
            }
            "m" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.move_to(x, y);
                }
            }
            "l" => {
                if let Some([x, y]) = numbers::<2>(operands) {
                    self.line_to(x, y);
                }
            }
            "c" | "v" | "y" => {
                if let [.., x, y] = operands {
                    if let (Some(x), Some(y)) = (number(x), number(y)) {
                        self.current_point = Some(self.ctm.apply(x, y));
                    }
                }
            }
            "h" => self.close_path(),
            "re" => {
                if let Some([x, y, width, height]) = numbers::<4>(operands) {
                    self.rectangle(x, y, width, height);
                }
            }
            "S" | "s" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => {
                if operation.operator == "s" || operation.operator == "b" {
                    self.close_path();
                }
                self.paint(true);
            }
            "n" => self.paint(false),
            _ => {}
        }
    }
}

pub(crate) fn interpret_operations(
    operations: &[Operation],
    encodings: &BTreeMap<Vec<u8>, &str>,
) -> PageGeometry {
    let mut interpreter = Interpreter::new(encodings);
    for operation in operations {
        interpreter.execute(operation);
    }
    interpreter.out
}
