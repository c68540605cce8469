//! IP 地址处理工具
//!
//! - 客户端 IP 提取（X-Forwarded-For → 连接地址 → 0.0.0.0）
//! - 私有 / 保留地址判断（命中则不查询外部 GeoIP）

use std::net::IpAddr;

use actix_web::HttpRequest;
use actix_web::http::header::HeaderMap;

/// 无法确定客户端地址时使用的占位 IP
pub const UNKNOWN_CLIENT_IP: &str = "0.0.0.0";

/// IPv4 保留段（标准库 `is_private` 等未覆盖的部分）
const RESERVED_V4_CIDRS: &[&str] = &[
    "100.64.0.0/10", // Shared Address Space (RFC 6598)
    "192.0.0.0/24",  // IETF Protocol Assignments
    "198.18.0.0/15", // Benchmarking (RFC 2544)
    "240.0.0.0/4",   // Reserved
];

/// IP 字符串分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpClass {
    /// 空串、回环、私有或保留地址
    Private,
    /// 可以交给外部服务查询的公网地址
    Public(IpAddr),
    /// 不是合法的 IP 地址
    Invalid,
}

/// 对原始 IP 字符串分类
pub fn classify_ip(raw: &str) -> IpClass {
    let raw = raw.trim();
    if raw.is_empty() {
        return IpClass::Private;
    }

    match raw.parse::<IpAddr>() {
        Ok(ip) if is_private_or_reserved(&ip) => IpClass::Private,
        Ok(ip) => IpClass::Public(ip),
        Err(_) => IpClass::Invalid,
    }
}

/// 检查 IP 是否为私有、回环或保留地址
pub fn is_private_or_reserved(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                || v4.is_multicast()
                || RESERVED_V4_CIDRS.iter().any(|cidr| ip_in_cidr(ip, cidr))
        }
        IpAddr::V6(v6) => {
            // ::ffff:a.b.c.d 按内嵌的 IPv4 判断
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_private_or_reserved(&IpAddr::V4(mapped));
            }
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7 (ULA)
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 (link-local)
                || ip_in_cidr(ip, "2001:db8::/32") // documentation
        }
    }
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false,
    }
}

/// 从 HttpRequest 提取客户端 IP
///
/// 1. X-Forwarded-For 的第一个非空值
/// 2. 连接的对端地址
/// 3. `0.0.0.0`
pub fn extract_client_ip(req: &HttpRequest) -> String {
    extract_forwarded_ip_from_headers(req.headers())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string())
}

/// 从 HeaderMap 提取 X-Forwarded-For 中的原始客户端 IP
pub fn extract_forwarded_ip_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
