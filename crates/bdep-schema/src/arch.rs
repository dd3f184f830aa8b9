/// Package architecture.
///
/// Binary packages are built for exactly one architecture; source packages
/// carry the [`Arch::Src`] pseudo-architecture. `noarch` binaries install on
/// every architecture and are always part of a [`Scope`](crate::Scope).
///
/// # Example
///
/// ```
/// use bdep_schema::Arch;
///
/// let arch: Arch = "x86_64".parse().unwrap();
/// assert_eq!(arch.as_str(), "x86_64");
/// assert!(arch.is_binary());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// Architecture-independent binaries.
    Noarch,
    /// 32-bit x86.
    I586,
    /// 64-bit x86.
    #[serde(rename = "x86_64")]
    X86_64,
    /// 32-bit compatibility packages shipped for `x86_64`.
    #[serde(rename = "x86_64-i586")]
    X86_64I586,
    /// 32-bit ARM (hard float).
    Armh,
    /// 64-bit ARM.
    Aarch64,
    /// 64-bit little-endian POWER.
    Ppc64le,
    /// 64-bit RISC-V.
    Riscv64,
    /// 64-bit `LoongArch`.
    Loongarch64,
    /// 32-bit little-endian MIPS.
    Mipsel,
    /// Elbrus, generic.
    E2k,
    /// Elbrus v4.
    E2kv4,
    /// Elbrus v5.
    E2kv5,
    /// Elbrus v6.
    E2kv6,
    /// Source packages.
    Src,
}

impl Arch {
    /// Every architecture a binary package can be built for.
    pub const BINARY: [Arch; 14] = [
        Self::Noarch,
        Self::I586,
        Self::X86_64,
        Self::X86_64I586,
        Self::Armh,
        Self::Aarch64,
        Self::Ppc64le,
        Self::Riscv64,
        Self::Loongarch64,
        Self::Mipsel,
        Self::E2k,
        Self::E2kv4,
        Self::E2kv5,
        Self::E2kv6,
    ];

    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Noarch => "noarch",
            Self::I586 => "i586",
            Self::X86_64 => "x86_64",
            Self::X86_64I586 => "x86_64-i586",
            Self::Armh => "armh",
            Self::Aarch64 => "aarch64",
            Self::Ppc64le => "ppc64le",
            Self::Riscv64 => "riscv64",
            Self::Loongarch64 => "loongarch64",
            Self::Mipsel => "mipsel",
            Self::E2k => "e2k",
            Self::E2kv4 => "e2kv4",
            Self::E2kv5 => "e2kv5",
            Self::E2kv6 => "e2kv6",
            Self::Src => "src",
        }
    }

    /// Whether binary packages can carry this architecture.
    pub fn is_binary(&self) -> bool {
        !matches!(self, Self::Src)
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "noarch" => Ok(Self::Noarch),
            "i586" => Ok(Self::I586),
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "x86_64-i586" => Ok(Self::X86_64I586),
            "armh" => Ok(Self::Armh),
            "aarch64" | "arm64" => Ok(Self::Aarch64),
            "ppc64le" => Ok(Self::Ppc64le),
            "riscv64" => Ok(Self::Riscv64),
            "loongarch64" => Ok(Self::Loongarch64),
            "mipsel" => Ok(Self::Mipsel),
            "e2k" => Ok(Self::E2k),
            "e2kv4" => Ok(Self::E2kv4),
            "e2kv5" => Ok(Self::E2kv5),
            "e2kv6" => Ok(Self::E2kv6),
            "src" | "srpm" => Ok(Self::Src),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names_and_aliases() {
        assert_eq!("X86_64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("amd64".parse::<Arch>().unwrap(), Arch::X86_64);
        assert_eq!("x86_64-i586".parse::<Arch>().unwrap(), Arch::X86_64I586);
        assert_eq!("srpm".parse::<Arch>().unwrap(), Arch::Src);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert!(err.contains("sparc"));
    }

    #[test]
    fn display_matches_serde_name() {
        for arch in Arch::BINARY {
            let json = serde_json::to_string(&arch).unwrap();
            assert_eq!(json, format!("\"{arch}\""));
        }
    }

    #[test]
    fn src_is_not_binary() {
        assert!(!Arch::Src.is_binary());
        assert!(Arch::BINARY.iter().all(Arch::is_binary));
    }
}
