pub mod cert_store;
pub mod certificate;
pub mod crl;
pub mod serial;

// Re-export commonly used types
pub use cert_store::{CertificateStore, Namespace, RevocationRecord};
pub use certificate::{CertificateError, PresentedCertificate};
pub use serial::{SerialError, SerialNumber};
