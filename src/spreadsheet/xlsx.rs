use crate::database::column::ColumnType;
use crate::error::{ResultMessage, ResultOptionChain, SheetIngestError};
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::{XmlNodeHelper, XmlReader, XmlTextContextHelper};
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::{Cell, CellType, DateSystem};
use crate::spreadsheet::excel::{self, load_relationships};
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::{apply_column_types, Importer, Section, Source, SpreadsheetError};
use crate::table::Table;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::BufRead;
use tracing::{debug, info, instrument};
use zip::ZipArchive;

// XML tag names used by the SpreadsheetML parts
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt"); // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs"); // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf"); // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh"); // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t"); // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet"); // Worksheet definition
const TAG_ROW: QName = QName(b"row"); // Row in worksheet
const TAG_CELL: QName = QName(b"c"); // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is"); // Inline string value
const TAG_VALUE: QName = QName(b"v"); // Cell value content

/// Imports the first row of a worksheet as the header and the following
/// rows as records from `.xlsx`/`.xlsm` workbooks.
#[derive(Clone, Debug, Default)]
pub struct XlsxImporter;

impl XlsxImporter {
    pub fn new() -> Self {
        XlsxImporter
    }

    /// Lists the sheet names of a workbook in workbook order.
    pub fn sheet_names(&self, source: &Source) -> Result<Vec<String>, SheetIngestError> {
        let workbook = XlsxWorkbook::open(source)?;
        Ok(workbook.sheets.into_iter().map(|(name, _)| name).collect())
    }
}

impl Importer for XlsxImporter {
    #[instrument(skip_all, fields(source = %source, section = %section))]
    fn load_data(
        &self,
        source: &Source,
        section: &Section,
        types: Option<&HashMap<String, ColumnType>>,
    ) -> Result<Table, SheetIngestError> {
        let mut workbook = XlsxWorkbook::open(source)?;
        let (sheet_name, zip_path) = workbook.select_sheet(section)?;
        let table = workbook
            .read_table(&sheet_name, &zip_path)
            .with_prefix(&format!("Error loading the xlsx file '{}'", source))?;
        if table.is_empty() {
            Err(SpreadsheetError::EmptyTable(source.to_string()))?
        }
        let table = match types {
            Some(types) => apply_column_types(table, types)?,
            None => table,
        };
        info!(
            sheet = %sheet_name,
            rows = table.row_count(),
            columns = table.columns().len(),
            "Loaded worksheet"
        );
        Ok(table)
    }
}

/// An opened XLSX package
struct XlsxWorkbook {
    /// Display name of the source, used in error messages
    name: String,
    zip: ZipArchive<UnifiedReader>,
    /// Cell type implied by each cell style index
    number_formats: Vec<CellType>,
    /// Worksheets as (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens the package and parses the workbook and style parts.
    fn open(source: &Source) -> Result<Self, SheetIngestError> {
        let name = source.to_string();
        let mut reader = UnifiedReader::new(source)?;
        if reader.is_compound_file()? {
            Err(SpreadsheetError::PasswordProtected(name.to_owned()))?;
        }

        let mut zip = ZipArchive::new(reader).map_err(SheetIngestError::from).with_prefix(&name)?;
        let (sheets, system) = load_workbook(&mut zip)?;
        if sheets.is_empty() {
            Err(SpreadsheetError::EmptyWorkbook(name.to_owned()))?
        }
        let number_formats = load_number_formats(&mut zip, system)?;
        debug!(source = %name, sheets = sheets.len(), "Opened workbook");
        Ok(XlsxWorkbook {
            name,
            zip,
            number_formats,
            sheets,
        })
    }

    /// Resolves a section to a `(sheet name, zip path)` pair. Names are matched
    /// exactly first, then case-insensitively.
    fn select_sheet(&self, section: &Section) -> Result<(String, String), SheetIngestError> {
        let position: Result<Option<usize>, SheetIngestError> = match section {
            Section::Index(index) => Ok(Some(*index).filter(|index| *index < self.sheets.len())),
            Section::Name(name) => Ok(self.sheets.iter().position(|(sheet, _)| sheet == name)).ok_none_else(|| {
                Ok(self
                    .sheets
                    .iter()
                    .position(|(sheet, _)| sheet.eq_ignore_ascii_case(name)))
            }),
        };
        position?
            .map(|index| self.sheets[index].to_owned())
            .ok_or_else(|| {
                SpreadsheetError::SheetNotFound {
                    sheet: section.to_string(),
                    source_name: self.name.to_owned(),
                }
                .into()
            })
    }

    fn read_table(&mut self, sheet_name: &str, zip_path: &str) -> Result<Table, SheetIngestError> {
        let shared_strings = self.load_shared_strings()?;
        let sheet = self.read_sheet(sheet_name, zip_path)?;
        sheet.into_table(&shared_strings)
    }

    /// Loads the shared string table; absent in workbooks without text cells.
    fn load_shared_strings(&mut self) -> Result<Vec<String>, SheetIngestError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Collects every cell that carries a value.
    fn read_sheet(&mut self, sheet_name: &str, zip_path: &str) -> Result<Sheet, SheetIngestError> {
        let mut sheet = Sheet::new(sheet_name);
        let mut row_count = 0usize;
        let mut col_count = 0usize;
        let mut row = 0usize;
        let mut col = 0usize;
        let mut kind = CellType::default();
        let mut value = String::new();
        let number_formats = &self.number_formats;
        let mut reader = self
            .zip
            .xml_reader(zip_path)?
            .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_ROW => {
                if let Some(index) = event.get_attribute_value("r")?.and_then(|r| r.parse::<usize>().ok()) {
                    row_count = index.saturating_sub(1);
                }
                col_count = 0;
            }
            Event::End(event) if event.name() == TAG_ROW => {
                row_count += 1;
            }
            Event::Start(event) if event.name() == TAG_CELL => {
                (row, col) = event
                    .get_attribute_value("r")?
                    .and_then(|reference| reference_to_index(&reference))
                    .unwrap_or((row_count, col_count));
                col_count = col + 1;
                value.clear();
                kind = CellType::from_type_attribute(event.get_attribute_value("t")?.as_deref());
                if kind == CellType::Number {
                    if let Some(style) = event.get_attribute_value("s")?.filter(|style| !style.is_empty()) {
                        let index = style.parse::<usize>()?;
                        kind = number_formats.get(index).copied().unwrap_or(CellType::Number);
                    }
                }
            }
            Event::Start(event) if event.name() == TAG_INLINE_STRING => {
                value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
            }
            Event::Start(event) if event.name() == TAG_VALUE => {
                value = read_string_value(&mut reader, TAG_VALUE, true)?;
            }
            Event::End(event) if event.name() == TAG_CELL => {
                if !value.is_empty() {
                    sheet.push(Cell {
                        row,
                        col,
                        kind,
                        value: std::mem::take(&mut value),
                    });
                }
            }
        });
        debug!(sheet = %sheet_name, cells = sheet.cells.len(), "Read worksheet cells");
        Ok(sheet)
    }
}

/// Loads worksheet names and paths from `xl/workbook.xml` and detects the date system.
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, DateSystem), SheetIngestError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut system = DateSystem::V1900;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<String>;
            let mut id = None::<String>;
            for result in event.attributes() {
                let attribute = result?;
                // The relationship id is namespaced (`r:id`)
                match attribute.key.local_name().as_ref() {
                    b"name" => name = Some(attribute.unescape_value()?.to_string()),
                    b"id" => id = Some(attribute.unescape_value()?.to_string()),
                    _ => (),
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id) {
                    sheets.push((name, path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            let is_1904 = event
                .get_attribute_value("date1904")?
                .map(|value| value == "1" || value == "true")
                .unwrap_or(false);
            if is_1904 {
                system = DateSystem::V1904;
            }
        }
    });
    Ok((sheets, system))
}

/// Loads the style part and maps every cell style to a cell type.
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, system: DateSystem) -> Result<Vec<CellType>, SheetIngestError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, system));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            format_indexes.push(
                event
                    .get_attribute_value("numFmtId")?
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "0".to_string()),
            );
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, system))
}

/// Reads the text of a string element up to `end_tag`, skipping phonetic runs.
/// `is_text_content` marks elements whose direct text is the value (`<v>`).
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SheetIngestError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
