use crate::value::FfiValue;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over raw bytes.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Hash of a single value: its type tag XORed with the hash of its payload.
///
/// Strings hash by content, scalars by bit pattern and opaque handles by
/// address only.
pub fn hash_value(value: &FfiValue) -> u64 {
    let payload = match value {
        FfiValue::Int(v) => hash_bytes(&v.to_le_bytes()),
        FfiValue::Float(v) => hash_bytes(&v.to_bits().to_le_bytes()),
        FfiValue::Double(v) => hash_bytes(&v.to_bits().to_le_bytes()),
        FfiValue::Bool(v) => hash_bytes(&[u8::from(*v)]),
        FfiValue::String(s) => hash_bytes(s.as_bytes()),
        FfiValue::Opaque(handle) => hash_bytes(&handle.addr().to_le_bytes()),
    };
    u64::from(value.kind().tag()) ^ payload
}

/// Cache key for a call: the name hash XOR-folded with every argument hash.
///
/// XOR folding is order-insensitive and cancels duplicated arguments, so the
/// hash alone never identifies a call; callers compare names and arguments too.
pub fn call_hash(function_name: &str, args: &[FfiValue]) -> u64 {
    args.iter()
        .fold(hash_bytes(function_name.as_bytes()), |acc, arg| {
            acc ^ hash_value(arg)
        })
}
