//! Benchmarks for method signature decoding and overload resolution.
//!
//! - Full decoding of method signatures (simple, generic, nested)
//! - Header-only decoding as done by the arity gate
//! - Resolution over a type with many same-named overloads

extern crate dotbreak;

use criterion::{criterion_group, criterion_main, Criterion};
use dotbreak::{
    metadata::{
        hierarchy::TypeTable,
        method::{MethodAttributes, MethodProps},
        resolver::{MetadataImport, MethodResolver},
        signatures::{decode_method_signature, SignatureDecoder},
        token::Token,
    },
    Error, Result,
};
use std::hint::black_box;

/// Benchmark decoding a simple void method with no parameters.
/// Signature: void Method()
fn bench_method_signature_void_no_params(c: &mut Criterion) {
    let signature = [0x00, 0x00, 0x01];

    c.bench_function("sig_method_void_no_params", |b| {
        b.iter(|| {
            let sig = decode_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark decoding a generic instance method.
/// Signature: instance T Method<T>(T, List<int>[])
fn bench_method_signature_generic(c: &mut Criterion) {
    let signature = [
        0x30, 0x01, 0x02, 0x1E, 0x00, 0x1E, 0x00, 0x1D, 0x15, 0x12, 0x49, 0x01, 0x08,
    ];

    c.bench_function("sig_method_generic", |b| {
        b.iter(|| {
            let sig = decode_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark decoding a method with many by-ref and array parameters.
/// Signature: void Method(int&, string[], object, int[,], double*, ...)
fn bench_method_signature_many_params(c: &mut Criterion) {
    let mut signature = vec![0x00, 0x10, 0x01];
    for _ in 0..4 {
        signature.extend_from_slice(&[0x10, 0x08]); // int&
        signature.extend_from_slice(&[0x1D, 0x0E]); // string[]
        signature.extend_from_slice(&[0x1C]); // object
        signature.extend_from_slice(&[0x0F, 0x0D]); // double*
    }

    c.bench_function("sig_method_many_params", |b| {
        b.iter(|| {
            let sig = decode_method_signature(black_box(&signature)).unwrap();
            black_box(sig)
        });
    });
}

/// Benchmark the header read used to reject overloads by arity.
fn bench_signature_header(c: &mut Criterion) {
    let signature = [0x30, 0x02, 0x03, 0x01, 0x1E, 0x00, 0x1E, 0x01, 0x08];

    c.bench_function("sig_header_only", |b| {
        b.iter(|| {
            let mut decoder = SignatureDecoder::new(black_box(&signature));
            black_box(decoder.read_header().unwrap())
        });
    });
}

struct Overloads {
    methods: Vec<MethodProps>,
}

impl MetadataImport for Overloads {
    fn enum_methods_with_name(&self, _type_token: Token, name: &str) -> Result<Vec<Token>> {
        Ok(self
            .methods
            .iter()
            .filter(|method| method.name == name)
            .map(|method| method.token)
            .collect())
    }

    fn method_props(&self, method: Token) -> Result<MethodProps> {
        self.methods
            .iter()
            .find(|props| props.token == method)
            .cloned()
            .ok_or_else(|| Error::Collaborator(format!("unknown method {method}")))
    }

    fn type_name(&self, token: Token) -> Result<String> {
        Err(Error::Collaborator(format!("unknown type {token}")))
    }
}

/// Benchmark resolving the last of 16 overloads of `Write`, each taking one more
/// `int` than the previous one, plus 8 single-parameter overloads of other types.
fn bench_resolve_overloads(c: &mut Criterion) {
    let mut methods = Vec::new();
    let mut row = 1;
    for element in [0x02, 0x03, 0x0A, 0x0C, 0x0D, 0x0E, 0x1C, 0x06] {
        methods.push(MethodProps {
            token: Token::method_def(row),
            owner: Token::type_def(2),
            name: "Write".to_string(),
            attributes: MethodAttributes::STATIC,
            signature: vec![0x00, 0x01, 0x01, element],
        });
        row += 1;
    }
    for count in 1..=16u8 {
        let mut signature = vec![0x00, count, 0x01];
        signature.extend(std::iter::repeat(0x08).take(count as usize));
        methods.push(MethodProps {
            token: Token::method_def(row),
            owner: Token::type_def(2),
            name: "Write".to_string(),
            attributes: MethodAttributes::STATIC,
            signature,
        });
        row += 1;
    }

    let metadata = Overloads { methods };
    let hierarchy = TypeTable::new();
    let arguments: Vec<String> = (0..16).map(|_| "int".to_string()).collect();

    c.bench_function("resolve_overloads", |b| {
        b.iter(|| {
            let resolver = MethodResolver::new(Some(&metadata), &hierarchy);
            let resolution = resolver
                .resolve(Token::type_def(2), "Write", black_box(&arguments))
                .unwrap();
            black_box(resolution)
        });
    });
}

criterion_group!(
    benches,
    bench_method_signature_void_no_params,
    bench_method_signature_generic,
    bench_method_signature_many_params,
    bench_signature_header,
    bench_resolve_overloads,
);
criterion_main!(benches);
