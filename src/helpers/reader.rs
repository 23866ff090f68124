use crate::error::SheetIngestError;
use crate::spreadsheet::Source;
use crate::spreadsheet::SpreadsheetError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;

/// Compound File Binary signature, used by encrypted OOXML packages and legacy `.xls`
const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// A unified reader over a local file or an in-memory buffer
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// Caller-provided bytes
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens the source for reading.
    ///
    /// # Errors
    /// Fails with `SpreadsheetError::FileNotFound` when a path does not point to a file.
    pub(crate) fn new(source: &Source) -> Result<UnifiedReader, SheetIngestError> {
        match source {
            Source::Path(path) => {
                if !path.is_file() {
                    Err(SpreadsheetError::FileNotFound(source.to_string()))?
                }
                let file = File::open(path)?;
                Ok(UnifiedReader::Local(BufReader::new(file)))
            }
            Source::Bytes(bytes) => Ok(UnifiedReader::Memory(Cursor::new(bytes.to_owned()))),
        }
    }

    /// Checks for a Compound File header, which is what Excel writes for
    /// password protected workbooks. Leaves the reader at the start.
    pub(crate) fn is_compound_file(&mut self) -> Result<bool, SheetIngestError> {
        let mut signature = [0u8; 8];
        let matched = match self.read_exact(&mut signature) {
            Ok(()) => signature == CFB_SIGNATURE,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => false,
            Err(error) => Err(error)?,
        };
        self.seek(SeekFrom::Start(0))?;
        Ok(matched)
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}
