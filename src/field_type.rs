/// Field type
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldType {
    /// String compared byte-wise
    String,
    /// Signed 64 bit integer
    Integer,
    /// 64 bit floating point number
    Number,
    /// Natural order: numbers by value, digit runs inside text by value, e.g. `file2 < file10`.
    /// In a column mixing both, empty values sort first, then numbers, then text:
    /// `"" < -7 < 1000000 < a1`.
    Natural,
}
