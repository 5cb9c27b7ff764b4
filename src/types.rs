/// Standardized occupation code from the reference taxonomy.
/// Example: `71402`
pub type Code = String;
/// Raw occupation title as supplied by a caller or taxonomy row.
/// Example: `Bürokauffrau`
pub type Title = String;
/// Diacritic-free, whitespace-collapsed form of a title.
/// Example: `Buerokauffrau`
pub type NormalizedString = String;
/// Lowercased word unit produced by the tokenizer.
/// Example: `buerokauffrau`
pub type Token = String;
/// Optional taxonomy category label attached to a reference entry.
/// Example: `B 71402-100`
pub type Category = String;
