#[cfg(test)]
mod parser_tests {
    use treelox as lox;

    use lox::ast_printer::AstPrinter;
    use lox::parser::{Parser, Stmt};
    use lox::scanner::Scanner;
    use lox::token::Token;

    fn scan(source: &str) -> Vec<Token<'_>> {
        let (tokens, errors) = Scanner::new(source.as_bytes()).scan_tokens();

        assert!(
            errors.is_empty(),
            "Scan errors in test source: {:?}",
            errors.iter().map(ToString::to_string).collect::<Vec<_>>()
        );

        tokens
    }

    /// Parse `source` as a single expression and render its prefix form.
    fn assert_expr_prints(source: &str, expected: &str) {
        let tokens = scan(source);
        let mut parser = Parser::new(&tokens);

        let expr = parser
            .parse_expression()
            .unwrap_or_else(|e| panic!("Parse failed for {:?}: {}", source, e));

        assert_eq!(AstPrinter::print(&expr), expected);
    }

    #[test]
    fn test_parser_01_literals() {
        assert_expr_prints("true", "true");
        assert_expr_prints("false", "false");
        assert_expr_prints("nil", "nil");
        assert_expr_prints("42", "42.0");
        assert_expr_prints("4.5", "4.5");
        assert_expr_prints("\"hi\"", "hi");
    }

    #[test]
    fn test_parser_02_precedence() {
        // factor binds tighter than term
        assert_expr_prints("1 + 2 * 3", "(+ 1.0 (* 2.0 3.0))");

        // grouping overrides
        assert_expr_prints("(1 + 2) * 3", "(* (group (+ 1.0 2.0)) 3.0)");

        // comparison over term, equality over comparison
        assert_expr_prints("1 + 2 < 3 == true", "(== (< (+ 1.0 2.0) 3.0) true)");

        // unary binds tightest
        assert_expr_prints("-1 * !false", "(* (- 1.0) (! false))");
    }

    #[test]
    fn test_parser_03_left_associativity() {
        assert_expr_prints("1 - 2 - 3", "(- (- 1.0 2.0) 3.0)");
        assert_expr_prints("8 / 4 / 2", "(/ (/ 8.0 4.0) 2.0)");
    }

    #[test]
    fn test_parser_04_logical_operators() {
        // or is lower than and
        assert_expr_prints("a or b and c", "(or a (and b c))");
    }

    #[test]
    fn test_parser_05_assignment_is_right_associative() {
        assert_expr_prints("a = b = 1", "(= a (= b 1.0))");
    }

    #[test]
    fn test_parser_06_calls_and_properties() {
        assert_expr_prints("f(1, 2)", "(call f 1.0 2.0)");
        assert_expr_prints("f()()", "(call (call f))");
        assert_expr_prints("a.b.c", "(. (. a b) c)");
        assert_expr_prints("a.b(c)", "(call (. a b) c)");
        assert_expr_prints("a.b = 1", "(= (. a b) 1.0)");
        assert_expr_prints("this.x", "(. this x)");
    }

    #[test]
    fn test_parser_07_invalid_assignment_target() {
        let tokens = scan("1 + 2 = 3");
        let mut parser = Parser::new(&tokens);

        let err = parser
            .parse_expression()
            .expect_err("Expected an invalid-assignment error");

        assert!(
            err.to_string().contains("Invalid assignment target"),
            "Got: {}",
            err
        );
    }

    #[test]
    fn test_parser_08_statement_program() {
        let tokens = scan("var a = 1; print a; { a = 2; }");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 3);

        assert!(matches!(statements[0], Stmt::Var { .. }));
        assert!(matches!(statements[1], Stmt::Print(_)));
        assert!(matches!(statements[2], Stmt::Block(_)));
    }

    #[test]
    fn test_parser_09_for_desugars_to_while() {
        let tokens = scan("for (var i = 0; i < 3; i = i + 1) print i;");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert!(errors.is_empty());
        assert_eq!(statements.len(), 1);

        // { var i; while (cond) { print i; i = i + 1; } }
        let Stmt::Block(ref outer) = statements[0] else {
            panic!("Expected the initializer block, got {:?}", statements[0]);
        };

        assert_eq!(outer.len(), 2);
        assert!(matches!(outer[0], Stmt::Var { .. }));

        let Stmt::While { ref body, .. } = outer[1] else {
            panic!("Expected a while loop, got {:?}", outer[1]);
        };

        let Stmt::Block(ref inner) = **body else {
            panic!("Expected the increment block, got {:?}", body);
        };

        assert_eq!(inner.len(), 2);
        assert!(matches!(inner[0], Stmt::Print(_)));
        assert!(matches!(inner[1], Stmt::Expression(_)));
    }

    #[test]
    fn test_parser_10_for_with_empty_clauses() {
        let tokens = scan("for (;;) print 1;");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert!(errors.is_empty());

        // no initializer and no increment: the loop is the whole statement,
        // with a synthesized `true` condition
        assert!(matches!(statements[0], Stmt::While { .. }));
    }

    #[test]
    fn test_parser_11_function_and_return() {
        let tokens = scan("fun add(a, b) { return a + b; }");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert!(errors.is_empty());

        let Stmt::Function(ref decl) = statements[0] else {
            panic!("Expected a function declaration");
        };

        assert_eq!(decl.name.lexeme, "add");
        assert_eq!(decl.params.len(), 2);
        assert_eq!(decl.body.len(), 1);
        assert!(matches!(decl.body[0], Stmt::Return { .. }));
    }

    #[test]
    fn test_parser_12_class_declaration() {
        let tokens = scan("class Point { init(x, y) { this.x = x; this.y = y; } norm() { return this.x; } }");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert!(errors.is_empty());

        let Stmt::Class {
            name,
            superclass,
            ref methods,
        } = statements[0]
        else {
            panic!("Expected a class declaration");
        };

        assert_eq!(name.lexeme, "Point");
        assert!(superclass.is_none());
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name.lexeme, "init");
        assert_eq!(methods[1].name.lexeme, "norm");
    }

    #[test]
    fn test_parser_13_error_recovery_collects_multiple_errors() {
        // two broken statements separated by a good one: synchronize must
        // reach the next boundary so both errors surface in one pass
        let tokens = scan("var = 1; print 2; var = 3;");
        let (statements, errors) = Parser::new(&tokens).parse();

        assert_eq!(errors.len(), 2, "Expected both syntax errors reported");
        assert_eq!(statements.len(), 1, "The good statement still parses");
        assert!(matches!(statements[0], Stmt::Print(_)));

        for err in &errors {
            assert!(
                err.to_string().contains("Expected variable name"),
                "Got: {}",
                err
            );
        }
    }

    #[test]
    fn test_parser_14_missing_semicolon() {
        let tokens = scan("print 1");
        let (_, errors) = Parser::new(&tokens).parse();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("Expected ';' after value"));
    }
}
