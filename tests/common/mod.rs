use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

fn save_document(
    path: &Path,
    pages: Vec<Vec<Operation>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for operations in pages {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

/// One text line per entry, 16pt apart, starting at (50, 780).
pub fn create_test_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    let pages = pages
        .iter()
        .map(|lines| {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("TL", vec![16.into()]),
                Operation::new("Td", vec![50.into(), 780.into()]),
            ];

            for (index, line) in lines.iter().enumerate() {
                operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
                if index + 1 < lines.len() {
                    operations.push(Operation::new("T*", vec![]));
                }
            }
            operations.push(Operation::new("ET", vec![]));
            operations
        })
        .collect();

    save_document(path, pages)
}

/// A single page with a ruled grid: columns at x = 50, 150, 250, 350 and
/// rows at y = 780, 760, 740, 720. `cells[r][c]` is written inside row `r`
/// (top-down), column `c`.
pub fn create_ruled_pdf(path: &Path, cells: &[[&str; 3]; 3]) -> Result<(), Box<dyn std::error::Error>> {
    let columns = [50, 150, 250, 350];
    let rows = [780, 760, 740, 720];

    let mut operations = vec![Operation::new("w", vec![1.into()])];
    for x in columns {
        operations.push(Operation::new("m", vec![x.into(), 720.into()]));
        operations.push(Operation::new("l", vec![x.into(), 780.into()]));
    }
    for y in rows {
        operations.push(Operation::new("m", vec![50.into(), y.into()]));
        operations.push(Operation::new("l", vec![350.into(), y.into()]));
    }
    operations.push(Operation::new("S", vec![]));

    for (row_index, row) in cells.iter().enumerate() {
        for (column_index, text) in row.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let x = columns[column_index] + 5;
            let y = rows[row_index] - 15;
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![x.into(), y.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    save_document(path, vec![operations])
}
