// ==========================================
// 奶牛选配系统 - 导入层
// ==========================================
// 职责: 外部表格导入，生成引擎所需的强类型输入
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod data_cleaner;
pub mod dq_validator;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod herd_importer;
pub mod importer_trait;

// 重导出核心类型
pub use data_cleaner::{Cleaned, DataCleaner};
pub use dq_validator::{AnimalRoster, DqValidator, Validated};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, Mapped};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use herd_importer::HerdImporter;
pub use importer_trait::{FileParser, RawRow, RawTable};
